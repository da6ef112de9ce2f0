//! Unit tests for tag reconciliation.

use rstest::rstest;

use super::{TagError, TagReconciler, TagSet};
use crate::test_support::{FakeRemote, RemoteCall};

fn tag_set(pairs: &[(&str, &str)]) -> TagSet {
    pairs.iter().copied().collect()
}

fn reconciler() -> TagReconciler {
    TagReconciler::new("sys:")
}

fn components() -> Vec<String> {
    vec![String::from("pa-1"), String::from("prod-1")]
}

#[rstest]
fn diff_partitions_desired_keys() {
    let current = tag_set(&[("team", "storage"), ("env", "staging"), ("stale", "yes")]);
    let desired = tag_set(&[("team", "storage"), ("env", "production"), ("owner", "ops")]);

    let diff = reconciler().diff(&current, &desired);
    assert_eq!(diff.to_create, tag_set(&[("owner", "ops")]));
    assert_eq!(diff.to_update, tag_set(&[("env", "production")]));
    assert_eq!(diff.to_delete, vec![String::from("stale")]);
}

#[rstest]
fn diff_never_deletes_reserved_prefix_keys() {
    let current = tag_set(&[("sys:created-by", "remote"), ("sys:stack", "prod"), ("stale", "x")]);
    let desired = TagSet::new();

    let diff = reconciler().diff(&current, &desired);
    assert_eq!(diff.to_delete, vec![String::from("stale")]);
    assert!(diff.to_create.is_empty());
    assert!(diff.to_update.is_empty());
}

#[rstest]
fn identical_sets_produce_a_noop_diff() {
    let tags = tag_set(&[("team", "storage")]);
    let diff = reconciler().diff(&tags, &tags);
    assert!(diff.is_noop());
}

#[tokio::test]
async fn apply_noop_issues_no_remote_calls() {
    let remote = FakeRemote::new();
    let diff = reconciler().diff(&TagSet::new(), &TagSet::new());
    reconciler()
        .apply(&remote, &components(), &diff)
        .await
        .expect("noop apply should succeed");
    assert!(remote.calls().is_empty());
}

#[tokio::test]
async fn apply_issues_one_set_and_one_remove_call() {
    let remote = FakeRemote::new();
    remote.push_done();
    remote.push_done();

    let current = tag_set(&[("env", "staging"), ("stale", "yes")]);
    let desired = tag_set(&[("env", "production"), ("owner", "ops")]);
    let diff = reconciler().diff(&current, &desired);
    reconciler()
        .apply(&remote, &components(), &diff)
        .await
        .expect("apply should succeed");

    assert_eq!(
        remote.calls(),
        vec![
            RemoteCall::Tag {
                components: components(),
                tags: tag_set(&[("env", "production"), ("owner", "ops")]),
            },
            RemoteCall::Untag {
                components: components(),
                keys: vec![String::from("stale")],
            },
        ]
    );
}

#[tokio::test]
async fn apply_with_only_deletions_skips_the_set_call() {
    let remote = FakeRemote::new();
    remote.push_done();

    let current = tag_set(&[("stale", "yes")]);
    let diff = reconciler().diff(&current, &TagSet::new());
    reconciler()
        .apply(&remote, &components(), &diff)
        .await
        .expect("apply should succeed");

    assert_eq!(
        remote.calls(),
        vec![RemoteCall::Untag {
            components: components(),
            keys: vec![String::from("stale")],
        }]
    );
}

#[tokio::test]
async fn remove_failure_after_set_surfaces_aggregated_error() {
    let remote = FakeRemote::new();
    remote.push_done();
    remote.push_error("InternalError", "untag rejected");

    let current = tag_set(&[("stale", "yes")]);
    let desired = tag_set(&[("owner", "ops")]);
    let diff = reconciler().diff(&current, &desired);
    let err = reconciler()
        .apply(&remote, &components(), &diff)
        .await
        .expect_err("remove failure should surface");

    assert!(matches!(err, TagError::Remove { retained: 1, .. }));
    // The set call ran first, so the addition stays in effect remotely.
    assert_eq!(remote.calls().len(), 2);
}
