//! Delete flow: idempotent deletion and association restoration.

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::poll::{self, ConvergenceCriteria};
use crate::remote::RemoteApi;
use crate::retry::{self, RetryError};

use super::error::{EngineError, Operation};
use super::{ADD_MEMBERS_PARAMETER, Orchestrator, REMOVE_MEMBERS_PARAMETER};

impl<R: RemoteApi> Orchestrator<R> {
    /// Deletes the resource, tolerating prior deletion.
    ///
    /// A delete response classified as not-found is success on every
    /// invocation, so calling `delete` repeatedly on an already-absent
    /// resource succeeds each time. When the profile tracks statuses the
    /// call then waits for the resource to disappear, honouring the
    /// profile's choice of whether absence converges.
    ///
    /// When `restore_default_member` is supplied the resource is an
    /// association whose create replaced a default: the default association
    /// is restored **before** the managed member is removed, the documented
    /// reverse of the create ordering. A restore failure aborts the delete
    /// so the parent is never left without the association it is owed.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Identifier`] when `id` does not decode, and
    /// the mapped retry or convergence outcome for remote failures.
    pub async fn delete(
        &self,
        id: &str,
        restore_default_member: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<(), EngineError> {
        let components = self.decode_id(id)?;
        if let Some(default_member) = restore_default_member {
            return self
                .delete_association(id, &components, default_member, cancel)
                .await;
        }

        match retry::execute(
            &self.retry_policy,
            &self.profile.classifiers.delete,
            cancel,
            || self.remote.delete_resource(&components),
        )
        .await
        {
            Ok(()) | Err(RetryError::NotFound(_)) => {}
            Err(error) => {
                return Err(EngineError::from_retry(
                    Operation::Delete,
                    &self.profile.kind,
                    id,
                    error,
                ));
            }
        }

        if self.profile.tracks_status() {
            let criteria = ConvergenceCriteria::until_gone()
                .failing_on(self.profile.failed_statuses.clone())
                .absence_converges(self.profile.deletion_absence_converges);
            let schedule = self.config.poll_schedule(self.config.delete_timeout());
            let _residual = poll::wait_for(&schedule, &criteria, cancel, || {
                self.fetch_state(&components, cancel)
            })
            .await
            .map_err(|error| {
                EngineError::from_poll(Operation::Delete, &self.profile.kind, id, error)
            })?;
        }
        debug!(kind = %self.profile.kind, id = %id, "resource deletion converged");
        Ok(())
    }

    /// Association delete: restore the default member, then remove the
    /// managed one.
    async fn delete_association(
        &self,
        id: &str,
        components: &[String],
        default_member: &str,
        cancel: &CancellationToken,
    ) -> Result<(), EngineError> {
        let [parent_id, member_id] = components else {
            return Err(EngineError::validation(format!(
                "association identifier '{id}' must decode to parent and member components"
            )));
        };

        let _guard = self.locks.acquire(parent_id).await;

        // Restore first: if this fails the managed association stays in
        // place and the delete reports the error rather than orphaning the
        // parent.
        self.modify_members(
            parent_id,
            ADD_MEMBERS_PARAMETER,
            default_member,
            Operation::RestoreDefaultMember,
            &self.profile.classifiers.create,
            false,
            cancel,
        )
        .await?;

        self.modify_members(
            parent_id,
            REMOVE_MEMBERS_PARAMETER,
            member_id,
            Operation::Delete,
            &self.profile.classifiers.delete,
            true,
            cancel,
        )
        .await?;
        debug!(kind = %self.profile.kind, id = %id, "association removed and default restored");
        Ok(())
    }
}
