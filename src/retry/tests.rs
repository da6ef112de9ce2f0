//! Unit tests for the retry executor.

use std::future;
use std::time::Duration;

use rstest::rstest;
use tokio_util::sync::CancellationToken;

use super::{RetryError, RetryPolicy, execute};
use crate::classify::ErrorClassifier;
use crate::remote::RemoteError;

fn throttled() -> RemoteError {
    RemoteError::new("Throttling", "rate exceeded")
}

fn transient_classifier() -> ErrorClassifier {
    ErrorClassifier::default().transient_code("Throttling")
}

#[rstest]
#[case(0, Duration::from_millis(500))]
#[case(1, Duration::from_secs(1))]
#[case(2, Duration::from_secs(2))]
#[case(3, Duration::from_secs(4))]
#[case(10, Duration::from_secs(30))]
fn delay_grows_exponentially_and_caps(#[case] attempt: u32, #[case] expected: Duration) {
    let policy = RetryPolicy::default();
    assert_eq!(policy.delay_for_attempt(attempt), expected);
}

#[tokio::test(start_paused = true)]
async fn always_transient_stub_retries_then_exhausts_budget() {
    let policy = RetryPolicy::default();
    let cancel = CancellationToken::new();
    let mut attempts = 0u32;

    let result: Result<(), RetryError> = execute(&policy, &transient_classifier(), &cancel, || {
        attempts += 1;
        future::ready(Err(throttled()))
    })
    .await;

    assert_eq!(
        result,
        Err(RetryError::TimedOut {
            last_error: throttled(),
        })
    );
    // At least two backoff retries inside the two-minute window, plus the
    // initial attempt and the final direct attempt.
    assert!(attempts >= 4, "expected at least 4 attempts, got {attempts}");
}

#[tokio::test(start_paused = true)]
async fn succeeds_once_the_transient_failure_clears() {
    let policy = RetryPolicy::default();
    let cancel = CancellationToken::new();
    let mut attempts = 0u32;

    let result = execute(&policy, &transient_classifier(), &cancel, || {
        attempts += 1;
        future::ready(if attempts <= 2 { Err(throttled()) } else { Ok(attempts) })
    })
    .await;

    assert_eq!(result, Ok(3));
}

#[tokio::test]
async fn permanent_errors_are_never_retried() {
    let policy = RetryPolicy::default();
    let cancel = CancellationToken::new();
    let mut attempts = 0u32;

    let result: Result<(), RetryError> = execute(
        &policy,
        &ErrorClassifier::default(),
        &cancel,
        || {
            attempts += 1;
            future::ready(Err(RemoteError::new("ValidationException", "bad input")))
        },
    )
    .await;

    assert!(matches!(result, Err(RetryError::Permanent(_))));
    assert_eq!(attempts, 1);
}

#[tokio::test]
async fn not_found_classification_propagates_immediately() {
    let policy = RetryPolicy::default();
    let classifier = ErrorClassifier::default().not_found_code("ResourceNotFoundException");
    let cancel = CancellationToken::new();

    let result: Result<(), RetryError> = execute(&policy, &classifier, &cancel, || {
        future::ready(Err(RemoteError::new("ResourceNotFoundException", "gone")))
    })
    .await;

    assert!(matches!(result, Err(RetryError::NotFound(_))));
}

#[tokio::test]
async fn cancellation_returns_aborted_before_any_attempt() {
    let policy = RetryPolicy::default();
    let cancel = CancellationToken::new();
    cancel.cancel();
    let mut attempts = 0u32;

    let result: Result<(), RetryError> = execute(&policy, &transient_classifier(), &cancel, || {
        attempts += 1;
        future::ready(Err(throttled()))
    })
    .await;

    assert_eq!(result, Err(RetryError::Aborted));
    assert_eq!(attempts, 0);
}

#[tokio::test(start_paused = true)]
async fn cancellation_during_backoff_returns_aborted() {
    let policy = RetryPolicy::default();
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let result: Result<(), RetryError> = execute(&policy, &transient_classifier(), &cancel, || {
        future::ready(Err(throttled()))
    })
    .await;

    assert_eq!(result, Err(RetryError::Aborted));
}
