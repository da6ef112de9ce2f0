//! Transient-failure retry with backoff, jitter, and a final direct attempt.
//!
//! Remote calls against an eventually consistent API fail transiently for
//! throttling and not-yet-visible writes. The executor here absorbs those
//! failures up to a time budget, then makes exactly one more direct attempt
//! before reporting a timeout: propagation can complete precisely on the
//! deadline boundary, and a bare timeout without that second look produces
//! spurious failures. The two phases are deliberate, not incidental.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use thiserror::Error;
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::classify::{ErrorClass, ErrorClassifier};
use crate::remote::RemoteError;

/// Backoff and budget parameters for retrying a single remote call.
///
/// Policies are immutable and supplied per call site; the classifier
/// deciding which errors are worth retrying travels alongside the policy.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RetryPolicy {
    /// Delay before the first retry.
    pub initial_interval: Duration,
    /// Factor applied to the delay after each retry.
    pub multiplier: u32,
    /// Upper bound on the delay between retries.
    pub max_interval: Duration,
    /// Total time budget across attempts and sleeps.
    pub max_elapsed: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(500),
            multiplier: 2,
            max_interval: Duration::from_secs(30),
            max_elapsed: Duration::from_secs(120),
        }
    }
}

impl RetryPolicy {
    /// Returns the backoff delay before the given retry (0-indexed), capped
    /// at [`RetryPolicy::max_interval`].
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.saturating_pow(attempt);
        self.initial_interval
            .saturating_mul(factor)
            .min(self.max_interval)
    }
}

/// Terminal outcomes of a retried remote call.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum RetryError {
    /// Raised when the caller's cancellation signal fired.
    #[error("operation aborted by caller")]
    Aborted,
    /// Raised for errors the classifier marks permanent.
    #[error("permanent remote failure: {0}")]
    Permanent(RemoteError),
    /// Raised for errors the classifier maps to a missing resource.
    #[error("remote resource not found: {0}")]
    NotFound(RemoteError),
    /// Raised when the budget is exhausted, including the final direct
    /// attempt.
    #[error("retry budget exhausted: {last_error}")]
    TimedOut {
        /// Error observed on the final attempt.
        last_error: RemoteError,
    },
}

/// Invokes `operation`, retrying transiently classified failures until the
/// policy budget is spent, then makes one final direct attempt.
///
/// Backoff is exponential with jitter. Cancellation is checked before every
/// attempt and during every sleep, and returns [`RetryError::Aborted`],
/// distinct from [`RetryError::TimedOut`].
///
/// # Errors
///
/// Returns [`RetryError::Permanent`] or [`RetryError::NotFound`] as soon as
/// the classifier rules one, [`RetryError::Aborted`] when `cancel` fires,
/// and [`RetryError::TimedOut`] when the budget and the final attempt are
/// both exhausted.
pub async fn execute<T, F, Fut>(
    policy: &RetryPolicy,
    classifier: &ErrorClassifier,
    cancel: &CancellationToken,
    mut operation: F,
) -> Result<T, RetryError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RemoteError>>,
{
    let started = Instant::now();
    let mut attempt: u32 = 0;
    loop {
        if cancel.is_cancelled() {
            return Err(RetryError::Aborted);
        }
        let error = match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };
        match classifier.classify(&error) {
            ErrorClass::Permanent => return Err(RetryError::Permanent(error)),
            ErrorClass::NotFound => return Err(RetryError::NotFound(error)),
            ErrorClass::Transient => {}
        }
        let delay = jittered(policy.delay_for_attempt(attempt));
        attempt = attempt.saturating_add(1);
        if started.elapsed().saturating_add(delay) > policy.max_elapsed {
            debug!(attempt, %error, "retry budget spent; making one direct attempt");
            break;
        }
        debug!(attempt, ?delay, %error, "retrying transient remote failure");
        tokio::select! {
            () = cancel.cancelled() => return Err(RetryError::Aborted),
            () = sleep(delay) => {}
        }
    }

    match operation().await {
        Ok(value) => Ok(value),
        Err(error) => match classifier.classify(&error) {
            ErrorClass::Permanent => Err(RetryError::Permanent(error)),
            ErrorClass::NotFound => Err(RetryError::NotFound(error)),
            ErrorClass::Transient => Err(RetryError::TimedOut { last_error: error }),
        },
    }
}

/// Adds up to a quarter of the delay as random jitter so concurrent
/// reconciliations do not retry in lockstep.
fn jittered(delay: Duration) -> Duration {
    let quarter = u64::try_from((delay / 4).as_millis()).unwrap_or(u64::MAX);
    if quarter == 0 {
        return delay;
    }
    delay.saturating_add(Duration::from_millis(
        rand::thread_rng().gen_range(0..=quarter),
    ))
}

#[cfg(test)]
mod tests;
