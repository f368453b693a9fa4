//! Bounded retry around a single network operation.
//!
//! Each attempt reports a tagged [`Attempt`] rather than raising, and the
//! controller branches on the tag:
//!
//! | Attempt | [`RetryPolicy::run`] | [`RetryPolicy::run_with_backoff`] |
//! |---------|----------------------|-----------------------------------|
//! | `Success` | done | done |
//! | `Skipped` | done, not retried | done, not retried |
//! | `Failed` | retry immediately | retry immediately |
//! | `RateLimited` | retry immediately | sleep, double the delay, retry |
//!
//! Under backoff every rate-limit hit sleeps, the last one included, so the
//! caller never gets its answer sooner than the quota allows. Both variants
//! stop after `max_retries` attempts and settle as
//! [`ScrapeError::ExhaustedRetries`]. The pacing pause of the
//! [`crate::rate_limit::RateLimiter`] lives inside the operation itself, so
//! "immediately" still means "after the politeness pause".
//!
//! Backoff delays block only the calling task; other workers keep running.

use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{error, warn};

use crate::error::ScrapeError;

/// What one attempt of an operation produced.
#[derive(Debug)]
pub enum Attempt<T> {
    Success(T),
    /// Nothing to do; a normal outcome that is never retried.
    Skipped(String),
    Failed(ScrapeError),
    RateLimited(ScrapeError),
}

/// Terminal state of a retried operation.
#[derive(Debug)]
pub enum Settled<T> {
    Success(T),
    Skipped(String),
    Failed(ScrapeError),
}

/// Per-invocation retry bookkeeping, discarded when the operation settles.
#[derive(Debug, Clone, Copy)]
pub struct RetryState {
    pub attempt: u32,
    pub delay: Duration,
}

#[derive(Debug)]
pub struct RetryReport<T> {
    pub settled: Settled<T>,
    /// Attempts made, including the one that settled.
    pub attempts: u32,
    /// Backoff sleeps taken between attempts, in order.
    pub delays: Vec<Duration>,
}

#[derive(Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first.
    max_retries: u32,
    /// First rate-limit backoff delay (doubles with each further hit).
    base_delay: Duration,
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .finish()
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries: max_retries.max(1),
            base_delay,
        }
    }

    /// Download path policy: every failure is retried without a growing delay.
    pub async fn run<T, F, Fut>(&self, url: &str, op: F) -> RetryReport<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Attempt<T>>,
    {
        self.drive(url, op, false).await
    }

    /// Classification path policy: rate-limit signals back off exponentially.
    pub async fn run_with_backoff<T, F, Fut>(&self, url: &str, op: F) -> RetryReport<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Attempt<T>>,
    {
        self.drive(url, op, true).await
    }

    async fn drive<T, F, Fut>(&self, url: &str, mut op: F, backoff: bool) -> RetryReport<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Attempt<T>>,
    {
        let total_t0 = Instant::now();
        let mut state = RetryState {
            attempt: 0,
            delay: self.base_delay,
        };
        let mut delays = Vec::new();

        loop {
            state.attempt += 1;
            let attempt_t0 = Instant::now();

            let (err, rate_limited) = match op(state.attempt).await {
                Attempt::Success(value) => {
                    return RetryReport {
                        settled: Settled::Success(value),
                        attempts: state.attempt,
                        delays,
                    };
                }
                Attempt::Skipped(reason) => {
                    return RetryReport {
                        settled: Settled::Skipped(reason),
                        attempts: state.attempt,
                        delays,
                    };
                }
                Attempt::Failed(e) => (e, false),
                Attempt::RateLimited(e) => (e, true),
            };

            let backed_off = backoff && rate_limited;
            if backed_off {
                warn!(
                    %url,
                    attempt = state.attempt,
                    max = self.max_retries,
                    delay = ?state.delay,
                    error = %err,
                    "rate limited; backing off"
                );
                sleep(state.delay).await;
                delays.push(state.delay);
                state.delay = state.delay.saturating_mul(2);
            }

            if state.attempt >= self.max_retries {
                error!(
                    %url,
                    attempt = state.attempt,
                    max = self.max_retries,
                    elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
                    transient = err.is_transient(),
                    error = %err,
                    "exhausted retries"
                );
                return RetryReport {
                    settled: Settled::Failed(ScrapeError::ExhaustedRetries {
                        url: url.to_string(),
                        attempts: state.attempt,
                        last: Box::new(err),
                    }),
                    attempts: state.attempt,
                    delays,
                };
            }

            if !backed_off {
                warn!(
                    %url,
                    attempt = state.attempt,
                    max = self.max_retries,
                    elapsed_ms_attempt = attempt_t0.elapsed().as_millis() as u64,
                    error = %err,
                    "attempt failed; retrying"
                );
            }
        }
    }
}
