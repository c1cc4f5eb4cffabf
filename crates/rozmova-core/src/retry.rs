//! Retry policy and the generic call-with-retry primitive.
//!
//! Both network call sites (transcription, analysis) and the eventually
//! consistent persistence collaborator share the same discipline: a fixed
//! attempt cap, a delay schedule, and a retryable-error predicate. The
//! policy is a plain value so call sites and tests can swap schedules
//! without touching the loop itself.

use std::future::Future;
use std::time::Duration;

use crate::error::{PipelineError, Result};

/// Delay schedule for repeated attempts.
///
/// The delay before attempt `k` (zero-based, so the first retry is `k = 1`)
/// is `min(base_delay * 2^k, max_delay)`. A policy with `max_delay ==
/// base_delay` degenerates into a fixed delay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Policy for speech-to-text calls: 3 attempts, exponential backoff
    /// starting at 1 s and capped at 10 s.
    pub fn transcription() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(10_000),
        }
    }

    /// Policy for analysis calls; same schedule as transcription.
    pub fn analysis() -> Self {
        Self::transcription()
    }

    /// Policy for the persistence collaborator: 3 attempts with a fixed
    /// 1-second delay.
    pub fn store() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(1),
        }
    }

    /// Delay to wait before the given attempt. Attempt 0 never waits.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let exp = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt.min(16)));
        exp.min(self.max_delay)
    }
}

/// Run `op` up to `policy.max_attempts` times, sleeping per the policy's
/// schedule between attempts. Fatal errors (`is_retryable() == false`)
/// abort immediately; after the final attempt the last observed error is
/// returned verbatim.
pub async fn call_with_retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_err: Option<PipelineError> = None;
    for attempt in 0..policy.max_attempts {
        if attempt > 0 {
            tokio::time::sleep(policy.delay_for(attempt)).await;
        }
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() => last_err = Some(err),
            Err(err) => return Err(err),
        }
    }
    // max_attempts is always >= 1, so an error was recorded.
    Err(last_err.unwrap_or_else(|| PipelineError::Transport("no attempts were made".into())))
}
