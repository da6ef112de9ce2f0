//! Unit tests for the convergence poller.

use std::collections::VecDeque;
use std::future;
use std::time::Duration;

use rstest::rstest;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::{ConvergenceCriteria, PollError, PollSchedule, wait_for};
use crate::remote::{RemoteError, RemoteState};
use crate::retry::RetryError;

type FetchResult = Result<Option<RemoteState>, RetryError>;

fn schedule() -> PollSchedule {
    PollSchedule {
        initial_interval: Duration::from_secs(1),
        max_interval: Duration::from_secs(8),
        timeout: Duration::from_secs(60),
    }
}

fn criteria() -> ConvergenceCriteria {
    ConvergenceCriteria::until(["available"]).failing_on(["failed"])
}

/// Pops scripted fetch results in order, repeating the final fallback once
/// the script is exhausted.
fn scripted(
    mut responses: VecDeque<FetchResult>,
    fallback: FetchResult,
) -> impl FnMut() -> future::Ready<FetchResult> {
    move || future::ready(responses.pop_front().unwrap_or_else(|| fallback.clone()))
}

#[rstest]
#[case(1)]
#[case(2)]
#[case(5)]
#[tokio::test(start_paused = true)]
async fn reaches_target_after_n_polls(#[case] polls_before_ready: usize) {
    let mut responses: VecDeque<FetchResult> = VecDeque::new();
    for _ in 0..polls_before_ready {
        responses.push_back(Ok(Some(RemoteState::new("creating"))));
    }
    responses.push_back(Ok(Some(RemoteState::new("available"))));

    let cancel = CancellationToken::new();
    let started = Instant::now();
    let state = wait_for(
        &schedule(),
        &criteria(),
        &cancel,
        scripted(responses, Ok(None)),
    )
    .await
    .expect("wait should converge");

    assert_eq!(state, Some(RemoteState::new("available")));
    assert!(started.elapsed() <= schedule().timeout + schedule().max_interval);
}

#[tokio::test(start_paused = true)]
async fn timeout_carries_the_last_non_terminal_state() {
    let cancel = CancellationToken::new();
    let pending = RemoteState::new("creating");
    let result = wait_for(
        &schedule(),
        &criteria(),
        &cancel,
        scripted(VecDeque::new(), Ok(Some(pending.clone()))),
    )
    .await;

    assert_eq!(
        result,
        Err(PollError::TimedOut {
            last_state: Some(pending),
        })
    );
}

#[tokio::test(start_paused = true)]
async fn terminates_within_deadline_plus_one_interval() {
    let cancel = CancellationToken::new();
    let started = Instant::now();
    let result = wait_for(
        &schedule(),
        &criteria(),
        &cancel,
        scripted(VecDeque::new(), Ok(Some(RemoteState::new("creating")))),
    )
    .await;

    assert!(matches!(result, Err(PollError::TimedOut { .. })));
    assert!(started.elapsed() <= schedule().timeout + schedule().max_interval);
}

#[tokio::test]
async fn failure_status_terminates_with_the_observed_state() {
    let cancel = CancellationToken::new();
    let failed = RemoteState::new("failed")
        .with_last_error(RemoteError::new("TemplateError", "template rejected"));
    let result = wait_for(
        &schedule(),
        &criteria(),
        &cancel,
        scripted(VecDeque::new(), Ok(Some(failed.clone()))),
    )
    .await;

    assert_eq!(result, Err(PollError::Failed { state: failed }));
}

#[tokio::test(start_paused = true)]
async fn absence_converges_for_deletion_waits() {
    let mut responses: VecDeque<FetchResult> = VecDeque::new();
    responses.push_back(Ok(Some(RemoteState::new("deleting"))));
    responses.push_back(Ok(None));

    let cancel = CancellationToken::new();
    let state = wait_for(
        &schedule(),
        &ConvergenceCriteria::until_gone(),
        &cancel,
        scripted(responses, Ok(None)),
    )
    .await
    .expect("absence should converge");
    assert_eq!(state, None);
}

#[tokio::test]
async fn absence_is_an_error_when_it_does_not_converge() {
    let cancel = CancellationToken::new();
    let result = wait_for(
        &schedule(),
        &criteria(),
        &cancel,
        scripted(VecDeque::new(), Ok(None)),
    )
    .await;
    assert_eq!(result, Err(PollError::NotFound));
}

#[tokio::test]
async fn not_found_fetch_errors_count_as_absence() {
    let cancel = CancellationToken::new();
    let absent: FetchResult = Err(RetryError::NotFound(RemoteError::new(
        "ResourceNotFoundException",
        "gone",
    )));
    let state = wait_for(
        &schedule(),
        &ConvergenceCriteria::until_gone(),
        &cancel,
        scripted(VecDeque::new(), absent),
    )
    .await
    .expect("not-found fetch should converge a deletion wait");
    assert_eq!(state, None);
}

#[tokio::test]
async fn terminal_fetch_errors_surface() {
    let cancel = CancellationToken::new();
    let permanent: FetchResult = Err(RetryError::Permanent(RemoteError::new(
        "AccessDenied",
        "no permission",
    )));
    let result = wait_for(
        &schedule(),
        &criteria(),
        &cancel,
        scripted(VecDeque::new(), permanent),
    )
    .await;
    assert!(matches!(result, Err(PollError::Fetch(RetryError::Permanent(_)))));
}

#[tokio::test]
async fn cancellation_aborts_the_wait() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let result = wait_for(
        &schedule(),
        &criteria(),
        &cancel,
        scripted(VecDeque::new(), Ok(Some(RemoteState::new("creating")))),
    )
    .await;
    assert_eq!(result, Err(PollError::Aborted));
}
