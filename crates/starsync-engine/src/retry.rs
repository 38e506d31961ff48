//! Per-call retry with backoff for connector operations.

use std::future::Future;

use starsync_types::error::ConnectorError;

use crate::errors::compute_backoff;

/// Run `op` until it succeeds, fails with an error that may not be retried,
/// or `max_retries` retries are spent.
pub(crate) async fn with_retry<T, F, Fut>(
    operation: &'static str,
    max_retries: u32,
    mut op: F,
) -> Result<T, ConnectorError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ConnectorError>>,
{
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.can_retry() && attempt <= max_retries => {
                let delay = compute_backoff(&err, attempt);
                #[allow(clippy::cast_possible_truncation)]
                let delay_ms = delay.as_millis() as u64;
                tracing::warn!(
                    operation,
                    attempt,
                    max_retries,
                    delay_ms,
                    category = %err.category,
                    code = %err.code,
                    "Retryable error, will retry"
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => {
                if err.can_retry() {
                    tracing::warn!(
                        operation,
                        attempt,
                        category = %err.category,
                        code = %err.code,
                        "Max retries exhausted"
                    );
                }
                return Err(err);
            }
        }
    }
}
