// src/error_recovery.rs
//! Retry with exponential backoff for API operations.

use crate::algebras::EventSink;
use crate::constants::MAX_BACKOFF_SECS;
use crate::error::AppError;
use log::Level;
use std::time::{Duration, Instant};

/// Pacing and retry parameters for remote calls.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Slept before every attempt.
    pub delay: Duration,
    /// Total attempts, including the first.
    pub max_retries: u32,
    /// The wait after failed attempt `n` (0-based) is `delay * factor^n`.
    pub backoff_factor: f64,
}

impl RetryPolicy {
    pub fn new(delay: Duration, max_retries: u32, backoff_factor: f64) -> Self {
        Self {
            delay,
            max_retries: max_retries.max(1),
            backoff_factor,
        }
    }

    /// A policy that never sleeps; useful for tests and local fakes.
    pub fn immediate(max_retries: u32) -> Self {
        Self::new(Duration::ZERO, max_retries, 1.0)
    }

    /// Wait applied after the failed attempt with 0-based index `attempt`,
    /// capped at [`MAX_BACKOFF_SECS`].
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let cap = Duration::from_secs(MAX_BACKOFF_SECS);
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.delay.as_secs_f64() * self.backoff_factor.powi(exponent);
        Duration::try_from_secs_f64(secs).map_or(cap, |wait| wait.min(cap))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(
            Duration::from_secs_f64(crate::constants::DEFAULT_API_DELAY_SECS),
            crate::constants::DEFAULT_MAX_RETRIES,
            crate::constants::DEFAULT_BACKOFF_FACTOR,
        )
    }
}

/// Runs `operation` under `policy`, reporting each attempt to `events`.
///
/// Every attempt is preceded by the policy's fixed delay. Errors that are
/// not retryable end the loop immediately; the last error is returned
/// unchanged so callers see the original cause.
pub async fn retry_with_backoff<F, T, Fut>(
    policy: &RetryPolicy,
    events: &dyn EventSink,
    operation_name: &str,
    mut operation: F,
) -> Result<T, AppError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, AppError>>,
{
    let mut attempt: u32 = 0;
    loop {
        tokio::time::sleep(policy.delay).await;

        let started = Instant::now();
        let result = operation().await;
        let latency_ms = started.elapsed().as_millis().to_string();

        match result {
            Ok(value) => {
                events.record(
                    Level::Debug,
                    "API call successful",
                    &[
                        ("function", operation_name.to_string()),
                        ("attempt", (attempt + 1).to_string()),
                        ("latency_ms", latency_ms),
                    ],
                );
                return Ok(value);
            }
            Err(error) => {
                let last_attempt = attempt + 1 >= policy.max_retries;
                if last_attempt || !error.is_retryable() {
                    events.record(
                        Level::Error,
                        "API call failed permanently",
                        &[
                            ("function", operation_name.to_string()),
                            ("attempt", (attempt + 1).to_string()),
                            ("latency_ms", latency_ms),
                            ("retryable", error.is_retryable().to_string()),
                            ("error", error.to_string()),
                        ],
                    );
                    return Err(error);
                }

                let wait = policy.backoff_for(attempt);
                events.record(
                    Level::Warn,
                    "API call failed, retrying",
                    &[
                        ("function", operation_name.to_string()),
                        ("attempt", (attempt + 1).to_string()),
                        ("latency_ms", latency_ms),
                        ("error", error.to_string()),
                        ("wait_ms", wait.as_millis().to_string()),
                    ],
                );
                tokio::time::sleep(wait).await;
                attempt += 1;
            }
        }
    }
}
