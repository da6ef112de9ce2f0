//! Unit tests for the resource orchestrator.

mod association;
mod locks;

use std::sync::Arc;

use crate::classify::{ErrorClassifier, OperationClassifiers};
use crate::config::EngineConfig;
use crate::ident::IdScheme;
use crate::test_support::FakeRemote;

use super::{Orchestrator, ResourceProfile};

/// Millisecond-scale tuning so timeout paths stay fast in tests.
fn fast_config() -> EngineConfig {
    EngineConfig {
        retry_initial_interval_ms: 1,
        retry_multiplier: 2,
        retry_max_interval_ms: 4,
        retry_max_elapsed_ms: 40,
        poll_initial_interval_ms: 1,
        poll_max_interval_ms: 4,
        create_timeout_ms: 250,
        read_timeout_ms: 250,
        update_timeout_ms: 250,
        delete_timeout_ms: 250,
        reserved_tag_prefix: String::from("sys:"),
    }
}

fn classifiers() -> OperationClassifiers {
    OperationClassifiers {
        create: ErrorClassifier::default()
            .transient_message("InvalidParametersException", "profile does not exist"),
        read: ErrorClassifier::default().not_found_code("ResourceNotFoundException"),
        update: ErrorClassifier::default(),
        delete: ErrorClassifier::default()
            .not_found_code("ResourceNotFoundException")
            .not_found_code("InvalidVpcEndpointId.NotFound")
            .not_found_code("InvalidGroup.NotFound"),
    }
}

/// Parent/member association kind: slash-delimited two-component ids, no
/// asynchronous propagation.
fn association_profile() -> ResourceProfile {
    ResourceProfile::new("endpoint member association", IdScheme::Delimited('/'), 2)
        .with_classifiers(classifiers())
}

/// Catalogue artifact kind: colon-delimited ids, asynchronous propagation
/// with ready/failed statuses, taggable.
fn artifact_profile() -> ResourceProfile {
    ResourceProfile::new("catalogue artifact", IdScheme::Delimited(':'), 2)
        .ready_on(["available"])
        .failed_on(["failed"])
        .with_tagging(true)
        .with_classifiers(classifiers())
}

/// Gateway response kind: four-component ids, no propagation, no tags.
fn response_profile() -> ResourceProfile {
    ResourceProfile::new("gateway method response", IdScheme::Delimited('/'), 4)
        .with_classifiers(classifiers())
}

fn orchestrator(profile: ResourceProfile) -> (Orchestrator<FakeRemote>, FakeRemote) {
    let remote = FakeRemote::new();
    let engine = Orchestrator::new(Arc::new(remote.clone()), profile, &fast_config());
    (engine, remote)
}
