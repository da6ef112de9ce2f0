//! Per-resource reconciliation orchestrator.
//!
//! Composes the identifier codec, retry executor, convergence poller, and
//! tag reconciler into Create/Read/Update/Delete operations against an
//! abstract remote API. A resource moves through
//! `Pending -> Propagating -> Ready -> {Updating -> Ready} -> Deleting ->
//! Gone`, with `CreateFailed` and `DeleteFailed` as the terminal failure
//! phases. Each resource reconciles independently; the only shared state is
//! the per-parent lock registry guarding relationship-set mutations.

mod create;
mod delete;
mod error;
mod locks;
mod profile;
mod update;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::classify::ErrorClassifier;
use crate::config::EngineConfig;
use crate::remote::{ParameterSet, RemoteApi, RemoteState};
use crate::retry::{self, RetryError, RetryPolicy};
use crate::tags::TagReconciler;

pub use error::{EngineError, Operation};
pub use locks::LockRegistry;
pub use profile::{
    AssociationSpec, CreateOutcome, DesiredResource, ResourcePhase, ResourceProfile,
};

/// Attribute under which a parent reports its associated members.
pub const MEMBERS_ATTRIBUTE: &str = "members";
/// Update parameter adding members to a parent's relationship set.
pub const ADD_MEMBERS_PARAMETER: &str = "add_members";
/// Update parameter removing members from a parent's relationship set.
pub const REMOVE_MEMBERS_PARAMETER: &str = "remove_members";

/// Reconciles one kind of remote resource against its declared state.
pub struct Orchestrator<R> {
    remote: Arc<R>,
    profile: ResourceProfile,
    config: EngineConfig,
    retry_policy: RetryPolicy,
    tags: TagReconciler,
    locks: LockRegistry,
}

impl<R: RemoteApi> Orchestrator<R> {
    /// Creates an orchestrator for the given resource profile.
    #[must_use]
    pub fn new(remote: Arc<R>, profile: ResourceProfile, config: &EngineConfig) -> Self {
        Self {
            remote,
            profile,
            retry_policy: config.retry_policy(),
            tags: TagReconciler::new(&config.reserved_tag_prefix),
            locks: LockRegistry::new(),
            config: config.clone(),
        }
    }

    /// Returns the profile this orchestrator reconciles.
    #[must_use]
    pub fn profile(&self) -> &ResourceProfile {
        &self.profile
    }

    /// Reads the current remote state for `id`.
    ///
    /// Absence, whether reported cleanly or through a NotFound-classified
    /// error, surfaces as [`EngineError::NotFound`], distinct from transient
    /// failure, so callers can prune local state for resources deleted out
    /// of band.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Identifier`] when `id` does not decode,
    /// [`EngineError::NotFound`] when the components do not resolve, and
    /// the mapped retry outcome for remote failures.
    pub async fn read(
        &self,
        id: &str,
        cancel: &CancellationToken,
    ) -> Result<RemoteState, EngineError> {
        let components = self.decode_id(id)?;
        match self.fetch_state(&components, cancel).await {
            Ok(Some(state)) => Ok(state),
            Ok(None) => Err(EngineError::NotFound {
                kind: self.profile.kind.clone(),
                id: id.to_owned(),
            }),
            Err(error) => Err(EngineError::from_retry(
                Operation::Read,
                &self.profile.kind,
                id,
                error,
            )),
        }
    }

    fn encode_id(&self, components: &[String]) -> Result<String, EngineError> {
        Ok(self.profile.scheme.encode(components)?)
    }

    fn decode_id(&self, id: &str) -> Result<Vec<String>, EngineError> {
        Ok(self.profile.scheme.decode(id, self.profile.component_count)?)
    }

    /// Fetches state with transient-error retry under the read classifier.
    async fn fetch_state(
        &self,
        components: &[String],
        cancel: &CancellationToken,
    ) -> Result<Option<RemoteState>, RetryError> {
        retry::execute(&self.retry_policy, &self.profile.classifiers.read, cancel, || {
            self.remote.read_resource(components)
        })
        .await
    }

    /// Reads the parent's member list for association validation.
    async fn parent_members(
        &self,
        parent_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, EngineError> {
        let components = vec![parent_id.to_owned()];
        match self.fetch_state(&components, cancel).await {
            Ok(Some(state)) => Ok(state
                .attributes
                .get_str_list(MEMBERS_ATTRIBUTE)
                .unwrap_or_default()),
            Ok(None) => Err(EngineError::NotFound {
                kind: self.profile.kind.clone(),
                id: parent_id.to_owned(),
            }),
            Err(error) => Err(EngineError::from_retry(
                Operation::Read,
                &self.profile.kind,
                parent_id,
                error,
            )),
        }
    }

    /// Adds or removes one member of the parent's relationship set.
    ///
    /// `tolerate_absent` accepts NotFound-classified responses as success,
    /// matching idempotent removal of an already-detached member.
    async fn modify_members(
        &self,
        parent_id: &str,
        parameter: &str,
        member: &str,
        operation: Operation,
        classifier: &ErrorClassifier,
        tolerate_absent: bool,
        cancel: &CancellationToken,
    ) -> Result<(), EngineError> {
        let components = vec![parent_id.to_owned()];
        let changes = ParameterSet::new().with(parameter, vec![member.to_owned()]);
        match retry::execute(&self.retry_policy, classifier, cancel, || {
            self.remote.update_resource(&components, &changes)
        })
        .await
        {
            Ok(_) => Ok(()),
            Err(RetryError::NotFound(_)) if tolerate_absent => Ok(()),
            Err(error) => Err(EngineError::from_retry(
                operation,
                &self.profile.kind,
                parent_id,
                error,
            )),
        }
    }
}

#[cfg(test)]
mod tests;
