use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tokio::task::JoinError;

use crate::resilience::TimeoutError;
use crate::storage::StorageError;

/// Error type for the routes outside the recommendation pipeline.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Timeout(#[from] TimeoutError),

    #[error("Internal server error: {0}")]
    Task(#[from] JoinError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Storage(
                e @ (StorageError::MissingOperation { .. } | StorageError::ContractViolation { .. }),
            ) => {
                tracing::error!("Storage contract violation: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "CONTRACT_VIOLATION",
                    "The storage backend returned an unexpected response".to_string(),
                )
            }
            AppError::Storage(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Timeout(e) => {
                tracing::error!("{e}");
                (
                    StatusCode::REQUEST_TIMEOUT,
                    "TIMEOUT",
                    "The storage backend did not respond in time".to_string(),
                )
            }
            AppError::Task(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_maps_to_408() {
        let response = AppError::from(TimeoutError {
            label: "get_dropdown_options".to_string(),
            duration_ms: 5000,
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    }

    #[test]
    fn test_missing_operation_maps_to_500() {
        let response = AppError::from(StorageError::MissingOperation {
            operation: "get_dropdown_options".to_string(),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
