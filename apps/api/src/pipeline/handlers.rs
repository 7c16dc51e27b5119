//! Axum route handler for the recommendation pipeline.

use std::time::Duration;

use axum::{
    extract::{rejection::JsonRejection, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{info_span, warn, Instrument};
use uuid::Uuid;

use crate::models::{CandidateId, Recommendation, ValidationError};
use crate::pipeline::error::PipelineError;
use crate::pipeline::orchestrator::{PipelineFailure, PipelineSuccess, Stage};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationMetadata {
    pub careers_analyzed: usize,
    pub recommendations_generated: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationResponse {
    pub success: bool,
    pub candidate_id: CandidateId,
    pub recommendations: Vec<Recommendation>,
    /// Milliseconds.
    pub processing_time: u64,
    pub metadata: RecommendationMetadata,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureResponse {
    pub success: bool,
    pub error: String,
    pub candidate_id: Option<CandidateId>,
    pub processing_time: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl From<PipelineSuccess> for RecommendationResponse {
    fn from(success: PipelineSuccess) -> Self {
        Self {
            success: true,
            metadata: RecommendationMetadata {
                careers_analyzed: success.careers_analyzed,
                recommendations_generated: success.recommendations.len(),
            },
            candidate_id: success.candidate_id,
            recommendations: success.recommendations,
            processing_time: success.elapsed.as_millis() as u64,
        }
    }
}

impl FailureResponse {
    /// Internal diagnostics are only attached outside production.
    pub fn new(failure: &PipelineFailure, include_details: bool) -> Self {
        Self {
            success: false,
            error: failure.message(),
            candidate_id: failure.candidate_id.clone(),
            processing_time: failure.elapsed.as_millis() as u64,
            details: include_details.then(|| failure.error.to_string()),
        }
    }
}

/// Renders a pipeline failure with the status code of its error kind.
pub fn failure_response(failure: &PipelineFailure, include_details: bool) -> Response {
    let status = failure.kind().status();
    (status, Json(FailureResponse::new(failure, include_details))).into_response()
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/recommendations
///
/// Saves the candidate, scores the careers of their sector, stores and
/// returns the recommendations. Failures keep the shape
/// `{success: false, error, candidateId, processingTime, details?}`, including
/// bodies that are not JSON at all.
pub async fn handle_recommend(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response {
    let include_details = !state.config.is_production();

    let body = match payload {
        Ok(Json(body)) => body,
        Err(rejection) => {
            warn!("Rejected recommendation request body: {}", rejection.body_text());
            return failure_response(&rejected_body(&rejection), include_details);
        }
    };

    let span = info_span!("recommendation", request_id = %Uuid::new_v4());

    match state.orchestrator.run(&body).instrument(span).await {
        Ok(success) => Json(RecommendationResponse::from(success)).into_response(),
        Err(failure) => failure_response(&failure, include_details),
    }
}

/// An unreadable body fails validation before the pipeline starts.
fn rejected_body(rejection: &JsonRejection) -> PipelineFailure {
    PipelineFailure {
        stage: Stage::Validating,
        error: PipelineError::Validation(ValidationError::MalformedBody(rejection.body_text())),
        candidate_id: None,
        elapsed: Duration::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::body::to_bytes;
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::scoring::ScoringError;

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn refused_failure() -> PipelineFailure {
        PipelineFailure {
            stage: Stage::Scoring,
            error: PipelineError::Scoring(ScoringError::ConnectionRefused {
                endpoint: "http://scoring:5000/recommend".to_string(),
                reason: "tcp connect error".to_string(),
            }),
            candidate_id: Some(CandidateId::new("c1")),
            elapsed: Duration::from_millis(42),
        }
    }

    #[test]
    fn test_success_body_shape() {
        let response = RecommendationResponse::from(PipelineSuccess {
            candidate_id: CandidateId::new("c1"),
            recommendations: vec![json!({"title": "Engineer", "score": 0.9})],
            careers_analyzed: 1,
            elapsed: Duration::from_millis(12),
        });

        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "success": true,
                "candidateId": "c1",
                "recommendations": [{"title": "Engineer", "score": 0.9}],
                "processingTime": 12,
                "metadata": {"careersAnalyzed": 1, "recommendationsGenerated": 1}
            })
        );
    }

    #[tokio::test]
    async fn test_failure_response_in_development_has_details() {
        let response = failure_response(&refused_failure(), true);
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "AI recommendation failed");
        assert_eq!(body["candidateId"], "c1");
        assert_eq!(body["processingTime"], 42);
        assert!(body["details"]
            .as_str()
            .unwrap()
            .contains("unreachable"));
    }

    #[tokio::test]
    async fn test_failure_response_in_production_hides_details() {
        let body = body_json(failure_response(&refused_failure(), false)).await;
        assert!(body.get("details").is_none());
        assert_eq!(body["error"], "AI recommendation failed");
    }

    #[test]
    fn test_failure_before_save_has_null_candidate_id() {
        let failure = PipelineFailure {
            stage: Stage::Validating,
            error: PipelineError::Validation(ValidationError::MissingFields(vec![
                "name".to_string(),
            ])),
            candidate_id: None,
            elapsed: Duration::ZERO,
        };
        let body = serde_json::to_value(FailureResponse::new(&failure, false)).unwrap();
        assert_eq!(body["candidateId"], Value::Null);
        assert_eq!(body["error"], "Missing required fields: name");
    }
}
