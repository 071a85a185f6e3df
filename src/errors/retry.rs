use std::future::Future;
use std::time::{Duration, Instant};

use super::types::ExporterError;
use tracing::{debug, warn};

/// Backoff policy for fleet API requests. Retries stop once the next
/// delay would overrun the total elapsed budget.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub max_elapsed: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(10),
            max_elapsed: Duration::from_secs(30),
        }
    }
}

impl BackoffPolicy {
    /// Jittered exponential delay for the given attempt (0-indexed),
    /// capped at max_interval.
    pub fn delay(&self, attempt: u32) -> Duration {
        let base = self.initial_interval.as_secs_f64() * 2.0_f64.powi(attempt.min(16) as i32);
        let jitter = rand::random::<f64>() * self.initial_interval.as_secs_f64();
        Duration::from_secs_f64((base + jitter).min(self.max_interval.as_secs_f64()))
    }
}

/// Execute an async fetch with retry.
///
/// Retries only while the error is classified as retryable and the next
/// delay still fits within the elapsed-time budget.
pub async fn with_backoff<F, Fut, T>(
    operation_name: &str,
    policy: &BackoffPolicy,
    mut factory: F,
) -> Result<T, ExporterError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ExporterError>>,
{
    let started = Instant::now();
    let mut attempt: u32 = 0;

    loop {
        match factory().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                let classification = e.classify();
                if !classification.retryable {
                    warn!(
                        operation = operation_name,
                        error_type = classification.error_type,
                        "Non-retryable error, failing immediately"
                    );
                    return Err(e);
                }

                let delay = policy.delay(attempt);
                if started.elapsed() + delay > policy.max_elapsed {
                    warn!(
                        operation = operation_name,
                        attempt = attempt + 1,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Retry budget exhausted"
                    );
                    return Err(e);
                }

                debug!(
                    operation = operation_name,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Retrying fleet request"
                );

                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
