//! Bounded exponential backoff with jitter for connect attempts
//!
//! Broker and database connects are retried under this policy at
//! startup; when the attempts are exhausted the caller decides whether
//! to degrade the transport or fall back to lazy connection.

use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

/// Retry policy configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Max retry attempts after the initial try
    pub max_retries: u32,
    /// Delay before the first retry
    pub initial_delay_ms: u64,
    /// Cap applied to the computed delay
    pub max_delay_ms: u64,
    /// Exponential growth factor
    pub backoff_multiplier: f64,
    /// Fraction of the delay randomized in each direction
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_delay_ms: 500,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

/// Retry driver for async connect operations
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    /// Create a policy with explicit configuration
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Create a policy with default configuration
    pub fn with_defaults() -> Self {
        Self::new(RetryConfig::default())
    }

    /// Calculate delay for nth retry with exponential backoff + jitter
    fn calculate_delay(&self, attempt: u32) -> Duration {
        let base_delay = self.config.initial_delay_ms as f64
            * self.config.backoff_multiplier.powi(attempt as i32);

        let capped_delay = base_delay.min(self.config.max_delay_ms as f64);

        // Jitter to prevent thundering herd
        let jitter_range = capped_delay * self.config.jitter_factor;
        let jitter = (rand::random::<f64>() - 0.5) * jitter_range * 2.0;
        let final_delay = (capped_delay + jitter).max(0.0);

        Duration::from_millis(final_delay as u64)
    }

    /// Execute an operation, retrying on failure until the budget runs out
    pub async fn execute<F, Fut, T, E>(
        &self,
        operation: F,
        operation_name: &str,
    ) -> std::result::Result<T, E>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let delay = self.calculate_delay(attempt - 1);
                warn!(
                    "Retry attempt {}/{} for {} after {:?}",
                    attempt, self.config.max_retries, operation_name, delay
                );
                tokio::time::sleep(delay).await;
            }

            match operation().await {
                Ok(result) => {
                    if attempt > 0 {
                        info!(
                            "Operation {} succeeded on retry attempt {}/{}",
                            operation_name, attempt, self.config.max_retries
                        );
                    }
                    return Ok(result);
                }
                Err(e) => {
                    warn!(
                        "Attempt {}/{} failed for {}: {}",
                        attempt + 1,
                        self.config.max_retries + 1,
                        operation_name,
                        e
                    );
                    last_error = Some(e);
                }
            }
        }

        // max_retries >= 0 guarantees at least one attempt ran
        Err(last_error.unwrap())
    }
}
