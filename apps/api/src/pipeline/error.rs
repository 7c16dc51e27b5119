use axum::http::StatusCode;
use thiserror::Error;
use tokio::task::JoinError;

use crate::models::ValidationError;
use crate::resilience::TimeoutError;
use crate::scoring::ScoringError;
use crate::storage::StorageError;

/// Failure classes reported to API callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Timeout,
    /// The scoring service could not be reached at all.
    ConnectionRefused,
    /// A collaborator is missing an operation or answered with the wrong shape.
    ContractViolation,
    Unknown,
}

impl ErrorKind {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Timeout => StatusCode::REQUEST_TIMEOUT,
            ErrorKind::ConnectionRefused => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::ContractViolation | ErrorKind::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Anything a pipeline stage can fail with. Variants keep the original
/// error so classification survives timeouts and retries.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Timeout(#[from] TimeoutError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Scoring(#[from] ScoringError),

    #[error("collaborator task failed: {0}")]
    Task(#[from] JoinError),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Validation(_) => ErrorKind::Validation,
            PipelineError::Timeout(_) => ErrorKind::Timeout,
            PipelineError::Storage(StorageError::MissingOperation { .. })
            | PipelineError::Storage(StorageError::ContractViolation { .. }) => {
                ErrorKind::ContractViolation
            }
            PipelineError::Storage(StorageError::Database(_)) => ErrorKind::Unknown,
            PipelineError::Scoring(ScoringError::ConnectionRefused { .. }) => {
                ErrorKind::ConnectionRefused
            }
            PipelineError::Scoring(ScoringError::EmptyResponse)
            | PipelineError::Scoring(ScoringError::MalformedResponse(_)) => {
                ErrorKind::ContractViolation
            }
            PipelineError::Scoring(ScoringError::Http(e)) if e.is_timeout() => ErrorKind::Timeout,
            PipelineError::Scoring(ScoringError::Http(_))
            | PipelineError::Scoring(ScoringError::Api { .. })
            | PipelineError::Task(_) => ErrorKind::Unknown,
        }
    }
}
