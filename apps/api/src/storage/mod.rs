//! Storage collaborator: the fixed set of operations the pipeline needs from
//! persistence.
//!
//! Which concrete routine each operation reaches is decided by the Field
//! Mapping Table, not by this trait. `AppState` carries an
//! `Arc<dyn CandidateStore>`; `PgStore` is the production backend.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Candidate, CandidateId, Career, DropdownOptions, Recommendation};

pub mod postgres;

pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage operation '{operation}' is not implemented by the storage backend")]
    MissingOperation { operation: String },

    #[error("storage operation '{operation}' returned {problem}")]
    ContractViolation { operation: String, problem: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait CandidateStore: Send + Sync {
    /// Persists a new candidate and returns the id storage assigned to it.
    async fn save_candidate(&self, candidate: &Candidate) -> Result<CandidateId, StorageError>;

    /// Careers for one sector, in storage order.
    async fn fetch_careers(&self, sector: &str) -> Result<Vec<Career>, StorageError>;

    /// Stores recommendations against a saved candidate. Not idempotent.
    async fn update_recommendations(
        &self,
        candidate_id: &CandidateId,
        recommendations: &[Recommendation],
    ) -> Result<(), StorageError>;

    async fn get_dropdown_options(&self) -> Result<DropdownOptions, StorageError>;
}
