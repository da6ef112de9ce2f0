//! Update flow: changed fields only, plus tag reconciliation.

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::remote::{ParameterSet, RemoteApi};
use crate::retry;
use crate::tags::TagSet;

use super::error::{EngineError, Operation};
use super::Orchestrator;

impl<R: RemoteApi> Orchestrator<R> {
    /// Applies `changes` to the remote resource and reconciles tags.
    ///
    /// Only the supplied changed fields are sent, so concurrently modified
    /// unrelated fields are not clobbered; an empty change set issues no
    /// remote update call. Callers diff against their stored state with
    /// [`ParameterSet::changed_from`]. Tag reconciliation runs when the
    /// profile supports tagging and a desired tag set is supplied.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Identifier`] when `id` does not decode, the
    /// mapped retry outcome for remote failures, and [`EngineError::Tags`]
    /// when tag application fails.
    pub async fn update(
        &self,
        id: &str,
        changes: &ParameterSet,
        desired_tags: Option<&TagSet>,
        cancel: &CancellationToken,
    ) -> Result<(), EngineError> {
        let components = self.decode_id(id)?;

        if !changes.is_empty() {
            let _echoed = retry::execute(
                &self.retry_policy,
                &self.profile.classifiers.update,
                cancel,
                || self.remote.update_resource(&components, changes),
            )
            .await
            .map_err(|error| {
                EngineError::from_retry(Operation::Update, &self.profile.kind, id, error)
            })?;
            debug!(kind = %self.profile.kind, id = %id, fields = changes.len(), "remote update issued");
        }

        if let Some(desired) = desired_tags {
            if self.profile.supports_tags {
                self.reconcile_tags(id, &components, desired, cancel).await?;
            }
        }
        Ok(())
    }

    /// Lists remote tags, diffs against the desired set, and applies the
    /// minimal mutation set.
    async fn reconcile_tags(
        &self,
        id: &str,
        components: &[String],
        desired: &TagSet,
        cancel: &CancellationToken,
    ) -> Result<(), EngineError> {
        let current = retry::execute(
            &self.retry_policy,
            &self.profile.classifiers.update,
            cancel,
            || self.remote.list_tags(components),
        )
        .await
        .map_err(|error| {
            EngineError::from_retry(Operation::TagSync, &self.profile.kind, id, error)
        })?;

        let diff = self.tags.diff(&current, desired);
        if diff.is_noop() {
            return Ok(());
        }
        self.tags
            .apply(self.remote.as_ref(), components, &diff)
            .await
            .map_err(|source| EngineError::Tags {
                kind: self.profile.kind.clone(),
                id: id.to_owned(),
                source,
            })
    }
}
