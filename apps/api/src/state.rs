use std::sync::Arc;

use crate::config::Config;
use crate::mapping::FieldMapping;
use crate::pipeline::{Orchestrator, PipelinePolicy};
use crate::scoring::RecommendationScorer;
use crate::storage::CandidateStore;

/// Shared application state injected into all route handlers via Axum extractors.
/// Everything in here is immutable after startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub mapping: Arc<FieldMapping>,
    /// Storage collaborator. Default: PgStore.
    pub store: Arc<dyn CandidateStore>,
    /// Scoring collaborator. Default: HttpScoringClient.
    pub scorer: Arc<dyn RecommendationScorer>,
    pub orchestrator: Orchestrator,
}

impl AppState {
    /// Wires the orchestrator from the same handles the other routes use.
    pub fn new(
        config: Config,
        mapping: Arc<FieldMapping>,
        store: Arc<dyn CandidateStore>,
        scorer: Arc<dyn RecommendationScorer>,
    ) -> Self {
        let orchestrator = Orchestrator::new(
            Arc::clone(&store),
            Arc::clone(&scorer),
            Arc::clone(&mapping),
            PipelinePolicy::from(&config),
        );
        Self {
            config,
            mapping,
            store,
            scorer,
            orchestrator,
        }
    }
}
