//! Bounded retry with exponential backoff.
//!
//! Every failure class is retried the same way: a 404 is treated exactly
//! like a dropped connection. Sleeping goes through the `Sleeper` trait so
//! tests can observe the backoff schedule without waiting for it.

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error};

/// Total attempts per call, including the first.
pub const MAX_ATTEMPTS: u32 = 3;

/// Delay before the first retry; doubles on each subsequent retry.
pub const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// A failed request to the venue.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}: {body}")]
    Status { url: String, status: u16, body: String },

    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

// ---------------------------------------------------------------------------
// Sleeper
// ---------------------------------------------------------------------------

/// Blocks the calling task for a duration.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real sleeper backed by the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            initial_backoff: INITIAL_BACKOFF,
        }
    }
}

impl RetryPolicy {
    /// Backoff slept after the `failures`-th consecutive failure (1-based).
    pub fn backoff_after(&self, failures: u32) -> Duration {
        2u32.checked_pow(failures.saturating_sub(1))
            .map_or(Duration::MAX, |factor| self.initial_backoff.saturating_mul(factor))
    }

    /// Run `op` until it succeeds or `max_attempts` is reached.
    ///
    /// Sleeps between attempts only; the final failure is returned
    /// immediately without a trailing sleep.
    pub async fn run<T, E, F, Fut>(
        &self,
        sleeper: &dyn Sleeper,
        label: &str,
        mut op: F,
    ) -> Result<T, E>
    where
        E: std::fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut failures = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    failures += 1;
                    error!(target_url = label, attempt = failures, error = %e, "API request failed");
                    if failures >= self.max_attempts {
                        return Err(e);
                    }
                    let delay = self.backoff_after(failures);
                    debug!(target_url = label, delay_ms = delay.as_millis() as u64, "Retrying");
                    sleeper.sleep(delay).await;
                }
            }
        }
    }
}
