//! Retry with exponential backoff.
//!
//! Any failure is retried except 4xx client errors. The wait before retry *k*
//! (1-indexed) is `base_delay * 2^(k-1)`: 1s, 2s, 4s with the defaults. After
//! the last attempt the final error is returned as-is.

use crate::error::{is_client_error_message, RemoteError};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_BASE_DELAY_MS: u64 = 1000;

/// Retry budget and backoff base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Wait before the first retry; doubles on each subsequent retry.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    pub fn no_retry() -> Self {
        Self::new(0)
    }

    #[must_use]
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Delay before retry `retry` (1-indexed).
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exponent)
    }
}

/// Details handed to a retry observer before each retry sleep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryNotice {
    /// 1-indexed retry about to happen.
    pub attempt: u32,
    pub max_retries: u32,
    pub delay: Duration,
}

impl RetryNotice {
    pub fn delay_ms(&self) -> u64 {
        self.delay.as_millis() as u64
    }
}

impl fmt::Display for RetryNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "retry {}/{} in {} ms",
            self.attempt,
            self.max_retries,
            self.delay_ms()
        )
    }
}

/// Observer invoked before each retry. It is informational only.
pub type OnRetry = Arc<dyn Fn(RetryNotice) + Send + Sync>;

/// Errors that can say whether another attempt could help.
pub trait RetryableError: fmt::Display {
    /// Terminal errors fail immediately.
    fn is_terminal(&self) -> bool {
        is_client_error_message(&self.to_string())
    }
}

impl RetryableError for RemoteError {
    fn is_terminal(&self) -> bool {
        self.is_client_error() || is_client_error_message(&self.to_string())
    }
}

impl RetryableError for anyhow::Error {}

impl RetryableError for String {}

/// Run `operation` until it succeeds, fails terminally, or the budget is spent.
pub async fn with_retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    operation_name: &str,
    on_retry: Option<&OnRetry>,
    mut operation: F,
) -> Result<T, E>
where
    E: RetryableError,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut retries = 0;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_terminal() => {
                tracing::debug!(
                    target: "repolens::remote",
                    operation = operation_name,
                    attempt = retries + 1,
                    error = %e,
                    "client error, not retrying"
                );
                return Err(e);
            }
            Err(e) if retries >= policy.max_retries => {
                tracing::warn!(
                    target: "repolens::remote",
                    operation = operation_name,
                    max_retries = policy.max_retries,
                    error = %e,
                    "retries exhausted"
                );
                return Err(e);
            }
            Err(e) => {
                retries += 1;
                let delay = policy.delay_for_retry(retries);
                tracing::warn!(
                    target: "repolens::remote",
                    operation = operation_name,
                    attempt = retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "attempt failed, backing off"
                );
                if let Some(cb) = on_retry {
                    cb(RetryNotice {
                        attempt: retries,
                        max_retries: policy.max_retries,
                        delay,
                    });
                }
                sleep(delay).await;
            }
        }
    }
}
