//! Retry with exponential backoff for transient API failures
//!
//! Only errors classified as transient (429, 5xx, transport) are retried.
//! The default configuration makes a single attempt.

use crate::error::ClusterError;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Retry policy for cluster API calls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts including the first one (minimum 1)
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Upper bound on the delay between retries
    pub max_delay: Duration,
    /// Multiplier applied to the delay after each retry
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Allow `retries` additional attempts after the first
    pub fn with_retries(retries: u32) -> Self {
        Self {
            max_attempts: retries.saturating_add(1),
            ..Default::default()
        }
    }

    fn next_delay(&self, delay: Duration) -> Duration {
        let next = Duration::from_secs_f64(delay.as_secs_f64() * self.backoff_multiplier);
        std::cmp::min(next, self.max_delay)
    }
}

/// Run `operation` until it succeeds, fails permanently, or the attempts
/// are used up. Returns the last error on exhaustion.
pub async fn retry_with_backoff<F, Fut, T>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
) -> Result<T, ClusterError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ClusterError>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0u32;
    let mut delay = config.initial_delay;

    loop {
        attempt += 1;

        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_transient() || attempt >= max_attempts => return Err(e),
            Err(e) => {
                warn!(
                    event = "api_retry",
                    operation = %operation_name,
                    attempt = attempt,
                    error = %e,
                    delay_ms = delay.as_millis() as u64,
                    "Transient API failure, retrying"
                );
                tokio::time::sleep(delay).await;
                delay = config.next_delay(delay);
            }
        }
    }
}
