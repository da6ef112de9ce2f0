//! Tests for the association replacement and restoration sequences.

use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::engine::{AssociationSpec, DesiredResource, EngineError, Operation};
use crate::remote::{ParameterSet, RemoteState};
use crate::test_support::RemoteCall;

use super::{association_profile, orchestrator};

fn parent_state(members: &[&str]) -> RemoteState {
    RemoteState::new("available")
        .with_attributes(ParameterSet::new().with("members", json!(members)))
}

fn replacement_spec() -> DesiredResource {
    DesiredResource::new(ParameterSet::new()).with_association(
        AssociationSpec::new("vpce-1", "sg-2").replacing_default("sg-default"),
    )
}

fn add_call(member: &str) -> RemoteCall {
    RemoteCall::Update {
        components: vec![String::from("vpce-1")],
        changes: ParameterSet::new().with("add_members", vec![member.to_owned()]),
    }
}

fn remove_call(member: &str) -> RemoteCall {
    RemoteCall::Update {
        components: vec![String::from("vpce-1")],
        changes: ParameterSet::new().with("remove_members", vec![member.to_owned()]),
    }
}

#[tokio::test]
async fn create_adds_new_member_before_removing_the_default() {
    let (engine, remote) = orchestrator(association_profile());
    remote.push_state(parent_state(&["sg-default"]));
    remote.push_done();
    remote.push_done();

    let outcome = engine
        .create(&replacement_spec(), &CancellationToken::new())
        .await
        .expect("create should succeed");

    assert_eq!(outcome.id, "vpce-1/sg-2");
    assert!(outcome.compensation_failure.is_none());
    assert_eq!(
        remote.calls(),
        vec![
            RemoteCall::Read {
                components: vec![String::from("vpce-1")],
            },
            add_call("sg-2"),
            remove_call("sg-default"),
        ]
    );
}

#[tokio::test]
async fn removal_failure_still_returns_the_created_identifier() {
    let (engine, remote) = orchestrator(association_profile());
    remote.push_state(parent_state(&["sg-default"]));
    remote.push_done();
    remote.push_error("InternalError", "removal rejected");

    let outcome = engine
        .create(&replacement_spec(), &CancellationToken::new())
        .await
        .expect("create should still succeed");

    assert_eq!(outcome.id, "vpce-1/sg-2");
    assert!(matches!(
        outcome.compensation_failure,
        Some(EngineError::Remote {
            operation: Operation::ReplaceDefaultMember,
            ..
        })
    ));
}

#[tokio::test]
async fn missing_default_association_fails_validation_without_mutation() {
    let (engine, remote) = orchestrator(association_profile());
    remote.push_state(parent_state(&["sg-other"]));

    let err = engine
        .create(&replacement_spec(), &CancellationToken::new())
        .await
        .expect_err("expected validation failure");

    assert!(matches!(err, EngineError::Validation { .. }));
    // Only the validating read ran; no remote mutation was issued.
    assert_eq!(
        remote.calls(),
        vec![RemoteCall::Read {
            components: vec![String::from("vpce-1")],
        }]
    );
}

#[tokio::test]
async fn replacing_the_default_with_itself_is_rejected_before_any_call() {
    let (engine, remote) = orchestrator(association_profile());
    let desired = DesiredResource::new(ParameterSet::new()).with_association(
        AssociationSpec::new("vpce-1", "sg-default").replacing_default("sg-default"),
    );

    let err = engine
        .create(&desired, &CancellationToken::new())
        .await
        .expect_err("expected validation failure");

    assert!(matches!(err, EngineError::Validation { .. }));
    assert!(remote.calls().is_empty());
}

#[tokio::test]
async fn create_without_replacement_issues_a_single_add() {
    let (engine, remote) = orchestrator(association_profile());
    remote.push_done();

    let desired = DesiredResource::new(ParameterSet::new())
        .with_association(AssociationSpec::new("vpce-1", "sg-2"));
    let outcome = engine
        .create(&desired, &CancellationToken::new())
        .await
        .expect("create should succeed");

    assert_eq!(outcome.id, "vpce-1/sg-2");
    assert_eq!(remote.calls(), vec![add_call("sg-2")]);
}

#[tokio::test]
async fn delete_restores_the_default_before_removing_the_member() {
    let (engine, remote) = orchestrator(association_profile());
    remote.push_done();
    remote.push_done();

    engine
        .delete("vpce-1/sg-2", Some("sg-default"), &CancellationToken::new())
        .await
        .expect("delete should succeed");

    assert_eq!(
        remote.calls(),
        vec![add_call("sg-default"), remove_call("sg-2")]
    );
}

#[tokio::test]
async fn delete_aborts_when_the_restore_step_fails() {
    let (engine, remote) = orchestrator(association_profile());
    remote.push_error("InternalError", "restore rejected");

    let err = engine
        .delete("vpce-1/sg-2", Some("sg-default"), &CancellationToken::new())
        .await
        .expect_err("expected restore failure");

    assert!(matches!(
        err,
        EngineError::Remote {
            operation: Operation::RestoreDefaultMember,
            ..
        }
    ));
    // The managed member removal never ran.
    assert_eq!(remote.calls(), vec![add_call("sg-default")]);
}

#[tokio::test]
async fn delete_tolerates_an_already_detached_member() {
    let (engine, remote) = orchestrator(association_profile());
    remote.push_done();
    remote.push_error("InvalidGroup.NotFound", "member already detached");

    engine
        .delete("vpce-1/sg-2", Some("sg-default"), &CancellationToken::new())
        .await
        .expect("absent member should not fail the delete");
    assert_eq!(remote.calls().len(), 2);
}
