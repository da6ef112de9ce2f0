//! Create flow, including the association replacement sequence.

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::poll::{self, ConvergenceCriteria};
use crate::remote::{CreateRequest, RemoteApi};
use crate::retry;

use super::error::{EngineError, Operation};
use super::profile::{AssociationSpec, CreateOutcome, DesiredResource, ResourcePhase};
use super::{ADD_MEMBERS_PARAMETER, Orchestrator, REMOVE_MEMBERS_PARAMETER};

impl<R: RemoteApi> Orchestrator<R> {
    /// Creates the resource described by `desired` and returns its
    /// identifier.
    ///
    /// The remote create call runs through the retry executor under the
    /// create classifier, with one idempotency token covering the logical
    /// create across retries. When the profile tracks statuses the call
    /// waits for convergence on the ready set before returning.
    ///
    /// Association specs follow add-new-then-remove-old ordering, never the
    /// reverse, so the parent is never left with zero associations if the
    /// removal is interrupted. A removal failure after a successful
    /// addition still returns the new identifier, with the failure reported
    /// in [`CreateOutcome::compensation_failure`].
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] when an association precondition
    /// fails before any mutation, and the mapped retry or convergence
    /// outcome for remote failures.
    pub async fn create(
        &self,
        desired: &DesiredResource,
        cancel: &CancellationToken,
    ) -> Result<CreateOutcome, EngineError> {
        if let Some(association) = &desired.association {
            return self.create_association(association, cancel).await;
        }

        let request = CreateRequest {
            kind: self.profile.kind.clone(),
            parameters: desired.parameters.clone(),
            tags: desired.tags.clone(),
            idempotency_token: Uuid::new_v4().simple().to_string(),
        };
        let response = retry::execute(
            &self.retry_policy,
            &self.profile.classifiers.create,
            cancel,
            || self.remote.create_resource(&request),
        )
        .await
        .map_err(|error| {
            EngineError::from_retry(Operation::Create, &self.profile.kind, "(pending)", error)
        })?;

        if response.id_components.len() != self.profile.component_count {
            return Err(EngineError::validation(format!(
                "remote create returned {} identifier components, expected {}",
                response.id_components.len(),
                self.profile.component_count
            )));
        }
        let id = self.encode_id(&response.id_components)?;
        debug!(kind = %self.profile.kind, id = %id, "remote create accepted");

        if !self.profile.tracks_status() {
            return Ok(CreateOutcome {
                id,
                phase: ResourcePhase::Ready,
                state: response.state,
                compensation_failure: None,
            });
        }

        let criteria = ConvergenceCriteria::until(self.profile.ready_statuses.clone())
            .failing_on(self.profile.failed_statuses.clone());
        let schedule = self.config.poll_schedule(self.config.create_timeout());
        let components = response.id_components;
        let state = poll::wait_for(&schedule, &criteria, cancel, || {
            self.fetch_state(&components, cancel)
        })
        .await
        .map_err(|error| EngineError::from_poll(Operation::Create, &self.profile.kind, &id, error))?;

        Ok(CreateOutcome {
            id,
            phase: ResourcePhase::Ready,
            state,
            compensation_failure: None,
        })
    }

    /// Association create: validate, add the new member, then remove the
    /// replaced default.
    async fn create_association(
        &self,
        association: &AssociationSpec,
        cancel: &CancellationToken,
    ) -> Result<CreateOutcome, EngineError> {
        association.validate()?;
        if self.profile.component_count != 2 {
            return Err(EngineError::validation(format!(
                "association resources use two-component identifiers, profile declares {}",
                self.profile.component_count
            )));
        }

        // The parent's relationship set is read-modify-written below; hold
        // its lock for the whole sequence.
        let _guard = self.locks.acquire(&association.parent_id).await;

        if let Some(default_member) = &association.replace_default_member {
            let members = self.parent_members(&association.parent_id, cancel).await?;
            if !members.iter().any(|member| member == default_member) {
                return Err(EngineError::validation(format!(
                    "no association of default member '{default_member}' with '{}'",
                    association.parent_id
                )));
            }
        }

        self.modify_members(
            &association.parent_id,
            ADD_MEMBERS_PARAMETER,
            &association.member_id,
            Operation::Create,
            &self.profile.classifiers.create,
            false,
            cancel,
        )
        .await?;
        let id =
            self.encode_id(&[association.parent_id.clone(), association.member_id.clone()])?;
        debug!(kind = %self.profile.kind, id = %id, "association created");

        let mut compensation_failure = None;
        if let Some(default_member) = &association.replace_default_member {
            // The new association exists; only now is the default removed.
            if let Err(error) = self
                .modify_members(
                    &association.parent_id,
                    REMOVE_MEMBERS_PARAMETER,
                    default_member,
                    Operation::ReplaceDefaultMember,
                    &self.profile.classifiers.delete,
                    true,
                    cancel,
                )
                .await
            {
                warn!(id = %id, %error, "association created but default member removal failed");
                compensation_failure = Some(error);
            }
        }

        Ok(CreateOutcome {
            id,
            phase: ResourcePhase::Ready,
            state: None,
            compensation_failure,
        })
    }
}
