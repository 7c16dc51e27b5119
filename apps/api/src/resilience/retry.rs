use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Invokes `operation` up to `max_attempts` times (at least once).
///
/// Backoff is linear: the delay before attempt `k` (k ≥ 2) is
/// `base_delay * (k - 1)`. When every attempt fails, the last error is
/// returned as-is so callers can still classify it.
pub async fn with_retry<F, Fut, T, E>(
    mut operation: F,
    max_attempts: u32,
    base_delay: Duration,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= max_attempts => return Err(e),
            Err(e) => {
                let delay = base_delay * attempt;
                warn!(
                    "Attempt {}/{} failed: {}. Retrying after {}ms...",
                    attempt,
                    max_attempts,
                    e,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
