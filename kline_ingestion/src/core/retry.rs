// @file: kline_ingestion/src/core/retry.rs
// @description: Bounded retry with backoff for transient REST failures.
// @author: LAS.

use crate::core::errors::FetchError;
use crate::core::rate_limiter::RequestPacer;
use log::warn;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;


//
// POLICY
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        RetryPolicy {
            max_retries: 0,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Quadratic backoff (`base * attempt²`), or the server's Retry-After hint; both capped.
    pub fn backoff_for(&self, attempt: u32, error: &FetchError) -> Duration {
        if let Some(hint) = error.retry_after() {
            return hint.min(self.max_delay);
        }
        self.base_delay
            .saturating_mul(attempt.saturating_mul(attempt))
            .min(self.max_delay)
    }
}


//
// EXECUTION
//

#[derive(Debug)]
pub enum Attempt<T> {
    Done(T),
    Exhausted { error: FetchError, attempts: u32 },
    Cancelled,
}

/// Runs `op` until it succeeds, the policy is exhausted, or `cancel` fires.
/// Every try (including retries) waits for a pacer slot first.
pub async fn run_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    pacer: &RequestPacer,
    cancel: &CancellationToken,
    label: &str,
    mut op: F,
) -> Attempt<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let mut attempt: u32 = 0;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Attempt::Cancelled,
            _ = pacer.acquire() => {}
        }

        match op().await {
            Ok(value) => return Attempt::Done(value),
            Err(error) if attempt < policy.max_retries => {
                attempt += 1;
                let delay: Duration = policy.backoff_for(attempt, &error);
                warn!(
                    "{} failed (attempt {}/{}): {}. Retrying in {:?}",
                    label,
                    attempt,
                    policy.max_retries + 1,
                    error,
                    delay
                );
                if !pause(delay, cancel).await {
                    return Attempt::Cancelled;
                }
            }
            Err(error) => {
                return Attempt::Exhausted {
                    error,
                    attempts: attempt + 1,
                }
            }
        }
    }
}

/// Sleeps for `delay` unless cancelled first. Returns `false` when cancelled.
pub async fn pause(delay: Duration, cancel: &CancellationToken) -> bool {
    if delay.is_zero() {
        return !cancel.is_cancelled();
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}
