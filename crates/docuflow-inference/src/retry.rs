//! Bounded exponential backoff for transient inference failures.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use docuflow_core::{Error, Result};

/// Run `op` up to `max_attempts` times, sleeping `base_delay * 2^(n-1)`
/// between attempts. Only transient errors are retried; any other error
/// returns immediately. On exhaustion the last error is returned unchanged
/// so callers can wrap it with their own taxonomy.
pub async fn retry_with_backoff<T, F, Fut>(
    max_attempts: u32,
    base_delay: Duration,
    op_name: &str,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    debug_assert!(max_attempts >= 1);
    let mut last_err = None;

    for attempt in 1..=max_attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < max_attempts => {
                let delay = base_delay * 2u32.saturating_pow(attempt - 1);
                warn!(
                    op = op_name,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Transient inference failure, backing off"
                );
                tokio::time::sleep(delay).await;
                last_err = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_err.unwrap_or_else(|| Error::Internal(format!("{op_name}: retry loop underflow"))))
}
