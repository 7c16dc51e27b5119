use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinError;
use tracing::warn;

/// The caller stopped waiting for `label` after `duration_ms`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{label} timed out after {duration_ms}ms")]
pub struct TimeoutError {
    pub label: String,
    pub duration_ms: u64,
}

/// Races `operation` against a deadline.
///
/// This is a deadline on the caller's wait, not cancellation: the operation is
/// spawned onto the runtime and keeps running after the deadline fires; its
/// late result is dropped. Exactly one outcome reaches the caller. A panic in
/// the operation is re-raised here.
pub async fn with_timeout<F, T, E>(operation: F, duration: Duration, label: &str) -> Result<T, E>
where
    F: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: From<TimeoutError> + From<JoinError> + Send + 'static,
{
    let handle = tokio::spawn(operation);

    match tokio::time::timeout(duration, handle).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) if join_error.is_panic() => {
            std::panic::resume_unwind(join_error.into_panic())
        }
        Ok(Err(join_error)) => Err(E::from(join_error)),
        Err(_) => {
            // Dropping the JoinHandle detaches the task; it is not aborted.
            warn!("{label} exceeded its {}ms deadline", duration.as_millis());
            Err(E::from(TimeoutError {
                label: label.to_string(),
                duration_ms: duration.as_millis() as u64,
            }))
        }
    }
}
