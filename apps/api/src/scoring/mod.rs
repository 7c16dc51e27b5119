/// Scoring client: the single point of entry for calls to the external AI
/// recommendation service.
///
/// The pipeline only ever sees `RecommendationScorer`; `HttpScoringClient` is
/// the production implementation. Deadlines and retries are applied by the
/// caller (see `resilience`), so this client makes exactly one attempt per call.
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::mapping::{Field, FieldMapping};
use crate::models::{json_type, Candidate, Career, Recommendation};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);
const HEALTH_PATH: &str = "/health";

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("scoring service at {endpoint} is unreachable: {reason}")]
    ConnectionRefused { endpoint: String, reason: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("scoring service error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("scoring service returned an empty response")]
    EmptyResponse,

    #[error("scoring service returned {0} instead of a list of recommendations")]
    MalformedResponse(String),
}

#[async_trait]
pub trait RecommendationScorer: Send + Sync {
    /// Scores `careers` for `candidate`, returning recommendations in service order.
    async fn submit(
        &self,
        candidate: &Candidate,
        careers: &[Career],
    ) -> Result<Vec<Recommendation>, ScoringError>;

    /// Liveness probe used by the health endpoint.
    async fn is_alive(&self) -> bool;
}

/// Builds `{<ai_candidate>: candidate, <ai_careers>: careers}` with every key
/// taken from the mapping.
pub fn build_payload(mapping: &FieldMapping, candidate: &Candidate, careers: &[Career]) -> Value {
    let mut payload = Map::new();
    payload.insert(
        mapping.resolve(Field::AiCandidate).to_string(),
        Value::Object(candidate.to_external(mapping)),
    );
    payload.insert(
        mapping.resolve(Field::AiCareers).to_string(),
        Value::Array(careers.to_vec()),
    );
    Value::Object(payload)
}

/// Connect timeouts are reported as timeouts; only failures to establish a
/// connection for any other reason count as refused.
fn send_error(endpoint: &Url, e: reqwest::Error) -> ScoringError {
    if e.is_connect() && !e.is_timeout() {
        ScoringError::ConnectionRefused {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        }
    } else {
        ScoringError::Http(e)
    }
}

#[derive(Clone)]
pub struct HttpScoringClient {
    client: Client,
    endpoint: Url,
    health_url: Url,
    mapping: Arc<FieldMapping>,
}

impl HttpScoringClient {
    /// `endpoint` is the full scoring URL; the liveness probe is `/health` on
    /// the same origin.
    pub fn new(endpoint: &str, mapping: Arc<FieldMapping>) -> anyhow::Result<Self> {
        let endpoint = Url::parse(endpoint)
            .with_context(|| format!("SCORING_SERVICE_URL '{endpoint}' is not a valid URL"))?;
        let health_url = endpoint
            .join(HEALTH_PATH)
            .context("Could not derive scoring health URL")?;

        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoint,
            health_url,
            mapping,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl RecommendationScorer for HttpScoringClient {
    async fn submit(
        &self,
        candidate: &Candidate,
        careers: &[Career],
    ) -> Result<Vec<Recommendation>, ScoringError> {
        let payload = build_payload(&self.mapping, candidate, careers);

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&payload)
            .send()
            .await
            .map_err(|e| send_error(&self.endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Scoring service returned {}: {}", status, body);
            return Err(ScoringError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.bytes().await?;
        let recommendations = parse_recommendations(&body)?;

        debug!(
            "Scoring call succeeded: careers={}, recommendations={}",
            careers.len(),
            recommendations.len()
        );
        Ok(recommendations)
    }

    async fn is_alive(&self) -> bool {
        match self
            .client
            .get(self.health_url.clone())
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("Scoring health probe failed: {e}");
                false
            }
        }
    }
}

/// The body must be a JSON array. An empty body or a bare `null` is an
/// absent response, anything else is malformed.
fn parse_recommendations(body: &[u8]) -> Result<Vec<Recommendation>, ScoringError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ScoringError::EmptyResponse);
    }

    let value: Value = serde_json::from_slice(body)
        .map_err(|e| ScoringError::MalformedResponse(format!("invalid JSON ({e})")))?;

    match value {
        Value::Array(recommendations) => Ok(recommendations),
        Value::Null => Err(ScoringError::EmptyResponse),
        other => Err(ScoringError::MalformedResponse(json_type(&other).to_string())),
    }
}
