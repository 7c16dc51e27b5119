//! Recommendation pipeline: orchestrates one request end to end.
//!
//! Flow: validate → save candidate → fetch careers → AI scoring →
//!       persist recommendations → report.
//!
//! Stages run strictly one after another. Every collaborator call runs under
//! a deadline; only the scoring call is also retried, since it is the one
//! remote network hop and the write that follows it is not idempotent.
//! A saved candidate is never rolled back when a later stage fails.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::mapping::{Field, FieldMapping};
use crate::models::{Candidate, CandidateId, Recommendation};
use crate::pipeline::error::{ErrorKind, PipelineError};
use crate::resilience::{with_retry, with_timeout};
use crate::scoring::RecommendationScorer;
use crate::storage::CandidateStore;

const SCORING_LABEL: &str = "ai_scoring";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validating,
    Saving,
    FetchingCareers,
    Scoring,
    Persisting,
    Done,
}

impl Stage {
    /// Stable, caller-facing summary for a failure in this stage.
    fn failure_message(self) -> &'static str {
        match self {
            Stage::Validating => "Invalid candidate profile",
            Stage::Saving => "Failed to save candidate",
            Stage::FetchingCareers => "Failed to fetch careers",
            Stage::Scoring => "AI recommendation failed",
            Stage::Persisting => "Failed to save recommendations",
            Stage::Done => "Recommendation pipeline failed",
        }
    }
}

/// Deadlines and retry budget for collaborator calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelinePolicy {
    pub storage_timeout: Duration,
    pub scoring_timeout: Duration,
    pub scoring_max_attempts: u32,
    pub scoring_retry_base: Duration,
}

impl Default for PipelinePolicy {
    fn default() -> Self {
        Self {
            storage_timeout: Duration::from_secs(5),
            scoring_timeout: Duration::from_secs(30),
            scoring_max_attempts: 2,
            scoring_retry_base: Duration::from_secs(2),
        }
    }
}

impl From<&Config> for PipelinePolicy {
    fn from(config: &Config) -> Self {
        Self {
            storage_timeout: config.storage_timeout,
            scoring_timeout: config.scoring_timeout,
            scoring_max_attempts: config.scoring_max_attempts,
            scoring_retry_base: config.scoring_retry_base,
        }
    }
}

#[derive(Debug)]
pub struct PipelineSuccess {
    pub candidate_id: CandidateId,
    pub recommendations: Vec<Recommendation>,
    pub careers_analyzed: usize,
    pub elapsed: Duration,
}

/// Terminal failure. `candidate_id` is set whenever the save stage had
/// already succeeded, so callers can find the partially-processed record.
#[derive(Debug)]
pub struct PipelineFailure {
    pub stage: Stage,
    pub error: PipelineError,
    pub candidate_id: Option<CandidateId>,
    pub elapsed: Duration,
}

impl PipelineFailure {
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }

    /// Validation messages name the offending fields and are safe to show;
    /// every other stage gets its fixed summary.
    pub fn message(&self) -> String {
        match &self.error {
            PipelineError::Validation(e) => e.to_string(),
            _ => self.stage.failure_message().to_string(),
        }
    }
}

/// Where a run has got to. Survives a failing stage so the failure report
/// can say where it stopped and which id was assigned.
struct Progress {
    stage: Stage,
    candidate_id: Option<CandidateId>,
}

impl Progress {
    fn advance(&mut self, next: Stage) {
        debug!("pipeline stage {:?} -> {:?}", self.stage, next);
        self.stage = next;
    }
}

struct Completed {
    candidate_id: CandidateId,
    recommendations: Vec<Recommendation>,
    careers_analyzed: usize,
}

/// One orchestrator is shared by all requests; it holds only immutable
/// handles, so runs never contend with each other.
#[derive(Clone)]
pub struct Orchestrator {
    store: Arc<dyn CandidateStore>,
    scorer: Arc<dyn RecommendationScorer>,
    mapping: Arc<FieldMapping>,
    policy: PipelinePolicy,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn CandidateStore>,
        scorer: Arc<dyn RecommendationScorer>,
        mapping: Arc<FieldMapping>,
        policy: PipelinePolicy,
    ) -> Self {
        Self {
            store,
            scorer,
            mapping,
            policy,
        }
    }

    /// Runs the full pipeline for one inbound candidate profile.
    pub async fn run(&self, body: &Value) -> Result<PipelineSuccess, PipelineFailure> {
        let started = Instant::now();
        let mut progress = Progress {
            stage: Stage::Validating,
            candidate_id: None,
        };

        match self.execute(body, &mut progress).await {
            Ok(done) => {
                let elapsed = started.elapsed();
                info!(
                    "Generated {} recommendations from {} careers for candidate {} in {}ms",
                    done.recommendations.len(),
                    done.careers_analyzed,
                    done.candidate_id,
                    elapsed.as_millis()
                );
                Ok(PipelineSuccess {
                    candidate_id: done.candidate_id,
                    recommendations: done.recommendations,
                    careers_analyzed: done.careers_analyzed,
                    elapsed,
                })
            }
            Err(error) => {
                let failure = PipelineFailure {
                    stage: progress.stage,
                    error,
                    candidate_id: progress.candidate_id,
                    elapsed: started.elapsed(),
                };
                error!(
                    stage = ?failure.stage,
                    kind = ?failure.kind(),
                    candidate_id = ?failure.candidate_id.as_ref().map(CandidateId::as_str),
                    "Recommendation pipeline failed: {}",
                    failure.error
                );
                Err(failure)
            }
        }
    }

    async fn execute(
        &self,
        body: &Value,
        progress: &mut Progress,
    ) -> Result<Completed, PipelineError> {
        // Validating: no collaborator is touched before this passes.
        let mut candidate = Candidate::from_request(body, &self.mapping)?;

        // Saving
        progress.advance(Stage::Saving);
        let store = Arc::clone(&self.store);
        let unsaved = candidate.clone();
        let candidate_id = with_timeout(
            async move { store.save_candidate(&unsaved).await.map_err(PipelineError::from) },
            self.policy.storage_timeout,
            self.mapping.resolve(Field::SaveCandidate),
        )
        .await?;
        info!("Saved candidate {candidate_id}");
        progress.candidate_id = Some(candidate_id.clone());
        candidate.id = Some(candidate_id.clone());

        // FetchingCareers
        progress.advance(Stage::FetchingCareers);
        let store = Arc::clone(&self.store);
        let sector = candidate.sector.clone();
        let careers = with_timeout(
            async move { store.fetch_careers(&sector).await.map_err(PipelineError::from) },
            self.policy.storage_timeout,
            self.mapping.resolve(Field::FetchCareers),
        )
        .await?;
        info!("Fetched {} careers for sector '{}'", careers.len(), candidate.sector);

        // Scoring: each attempt gets its own deadline.
        progress.advance(Stage::Scoring);
        let candidate = Arc::new(candidate);
        let careers = Arc::new(careers);
        let recommendations: Vec<Recommendation> = with_retry(
            || {
                let scorer = Arc::clone(&self.scorer);
                let candidate = Arc::clone(&candidate);
                let careers = Arc::clone(&careers);
                with_timeout(
                    async move {
                        scorer
                            .submit(&candidate, &careers)
                            .await
                            .map_err(PipelineError::from)
                    },
                    self.policy.scoring_timeout,
                    SCORING_LABEL,
                )
            },
            self.policy.scoring_max_attempts,
            self.policy.scoring_retry_base,
        )
        .await?;

        // Persisting: never retried.
        progress.advance(Stage::Persisting);
        let store = Arc::clone(&self.store);
        let id = candidate_id.clone();
        let to_store = recommendations.clone();
        with_timeout(
            async move {
                store
                    .update_recommendations(&id, &to_store)
                    .await
                    .map_err(PipelineError::from)
            },
            self.policy.storage_timeout,
            self.mapping.resolve(Field::UpdateRecommendations),
        )
        .await?;

        progress.advance(Stage::Done);
        Ok(Completed {
            candidate_id,
            recommendations,
            careers_analyzed: careers.len(),
        })
    }
}
