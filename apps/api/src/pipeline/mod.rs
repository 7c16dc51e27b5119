// Recommendation pipeline: orchestrator, failure classification, HTTP handler.
// Collaborators are reached only through the storage and scoring traits.

pub mod error;
pub mod handlers;
pub mod orchestrator;

pub use orchestrator::{Orchestrator, PipelinePolicy};
