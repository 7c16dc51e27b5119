use axum::{extract::State, Json};
use chrono::Utc;
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns service status plus liveness of the AI scoring service.
/// The service itself reports "ok" even when scoring is down.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let ai_service = if state.scorer.is_alive().await {
        "up"
    } else {
        "down"
    };

    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "career-api",
        "timestamp": Utc::now().to_rfc3339(),
        "aiService": ai_service
    }))
}
