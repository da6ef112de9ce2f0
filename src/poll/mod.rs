//! Convergence polling against an eventually consistent remote API.
//!
//! A mutation accepted by the remote system settles asynchronously. The
//! poller fetches fresh state until a target status, a failure status,
//! absence, the deadline, or cancellation ends the wait, sleeping an
//! adaptive interval between fetches. Suspension is cooperative: only the
//! calling task blocks.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::remote::{RemoteState, StatusTag};
use crate::retry::RetryError;

/// Poll cadence and overall deadline for one convergence wait.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PollSchedule {
    /// Sleep before the second fetch; later sleeps double up to the cap.
    pub initial_interval: Duration,
    /// Upper bound for the adaptive interval.
    pub max_interval: Duration,
    /// Overall deadline for the wait.
    pub timeout: Duration,
}

/// Status sets describing when a wait has converged or failed.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ConvergenceCriteria {
    /// Statuses that complete the wait successfully.
    pub target: Vec<StatusTag>,
    /// Statuses that terminate the wait as a remote-side failure.
    pub failure: Vec<StatusTag>,
    /// Whether absence of the resource counts as convergence. Deletion
    /// waits set this; whether early absence is success or an error is
    /// resource specific, so the choice is always explicit.
    pub not_found_means_converged: bool,
}

impl ConvergenceCriteria {
    /// Builds criteria that succeed on any of the given statuses.
    #[must_use]
    pub fn until<I, S>(target: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<StatusTag>,
    {
        Self {
            target: target.into_iter().map(Into::into).collect(),
            failure: Vec::new(),
            not_found_means_converged: false,
        }
    }

    /// Builds criteria for a deletion wait: no target status, absence
    /// converges.
    #[must_use]
    pub fn until_gone() -> Self {
        Self {
            target: Vec::new(),
            failure: Vec::new(),
            not_found_means_converged: true,
        }
    }

    /// Adds statuses that terminate the wait as a failure.
    #[must_use]
    pub fn failing_on<I, S>(mut self, failure: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<StatusTag>,
    {
        self.failure = failure.into_iter().map(Into::into).collect();
        self
    }

    /// Overrides whether absence counts as convergence.
    #[must_use]
    pub fn absence_converges(mut self, converged: bool) -> Self {
        self.not_found_means_converged = converged;
        self
    }
}

/// Terminal non-success outcomes of a convergence wait.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum PollError {
    /// Raised when the resource is absent and absence does not converge.
    #[error("resource not found while waiting for convergence")]
    NotFound,
    /// Raised when the remote system reports a failure status.
    #[error("remote reached failure status '{}'{}", state.status, format_state_error(state))]
    Failed {
        /// Final state observed, including the remote error if reported.
        state: RemoteState,
    },
    /// Raised when the deadline passes without convergence; never a bare
    /// timeout with no context.
    #[error("convergence wait timed out; last observed status: {}", format_last_status(last_state.as_ref()))]
    TimedOut {
        /// Most recent non-terminal state, when any fetch succeeded.
        last_state: Option<RemoteState>,
    },
    /// Raised when the caller's cancellation signal fired.
    #[error("convergence wait aborted by caller")]
    Aborted,
    /// Raised when an individual fetch fails permanently or exhausts its own
    /// retry budget.
    #[error("status fetch failed: {0}")]
    Fetch(#[source] RetryError),
}

fn format_state_error(state: &RemoteState) -> String {
    state
        .last_error
        .as_ref()
        .map_or_else(String::new, |error| format!(": {error}"))
}

fn format_last_status(state: Option<&RemoteState>) -> String {
    state.map_or_else(|| String::from("none"), |observed| observed.status.to_string())
}

/// Polls `fetch` until the criteria resolve the wait.
///
/// Each `fetch` is expected to carry its own transient-error retry; a fetch
/// error classified as not-found is treated as absence. The sleep interval
/// starts at the schedule's initial interval and doubles up to its cap, so
/// the wait never overruns the deadline by more than one interval.
///
/// Returns `Ok(Some(state))` when a target status is reached and `Ok(None)`
/// when absence counts as convergence.
///
/// # Errors
///
/// Returns [`PollError::Failed`] on a failure status, [`PollError::NotFound`]
/// on absence that does not converge, [`PollError::TimedOut`] carrying the
/// last non-terminal state on deadline expiry, [`PollError::Aborted`] on
/// cancellation, and [`PollError::Fetch`] when a fetch fails terminally.
pub async fn wait_for<F, Fut>(
    schedule: &PollSchedule,
    criteria: &ConvergenceCriteria,
    cancel: &CancellationToken,
    mut fetch: F,
) -> Result<Option<RemoteState>, PollError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<RemoteState>, RetryError>>,
{
    let deadline = Instant::now() + schedule.timeout;
    let mut interval = schedule.initial_interval;
    let mut last_state: Option<RemoteState> = None;
    loop {
        if cancel.is_cancelled() {
            return Err(PollError::Aborted);
        }
        match fetch().await {
            Ok(Some(state)) => {
                if criteria.failure.contains(&state.status) {
                    return Err(PollError::Failed { state });
                }
                if criteria.target.contains(&state.status) {
                    return Ok(Some(state));
                }
                debug!(status = %state.status, "resource not yet converged");
                last_state = Some(state);
            }
            Ok(None) | Err(RetryError::NotFound(_)) => {
                if criteria.not_found_means_converged {
                    return Ok(None);
                }
                return Err(PollError::NotFound);
            }
            Err(RetryError::Aborted) => return Err(PollError::Aborted),
            Err(error) => return Err(PollError::Fetch(error)),
        }
        if Instant::now() + interval > deadline {
            return Err(PollError::TimedOut { last_state });
        }
        tokio::select! {
            () = cancel.cancelled() => return Err(PollError::Aborted),
            () = sleep(interval) => {}
        }
        interval = interval.saturating_mul(2).min(schedule.max_interval);
    }
}

#[cfg(test)]
mod tests;
