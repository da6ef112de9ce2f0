//! Resource kind descriptors, desired-state inputs, and operation outcomes.

use std::fmt;

use crate::classify::OperationClassifiers;
use crate::ident::IdScheme;
use crate::remote::{ParameterSet, RemoteState, StatusTag};
use crate::tags::TagSet;

use super::error::EngineError;

/// Lifecycle phase of a managed resource.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ResourcePhase {
    /// Create accepted locally but not yet issued remotely.
    Pending,
    /// Create issued; waiting for the remote system to converge.
    Propagating,
    /// Converged on the most recent accepted mutation.
    Ready,
    /// Update issued; waiting for convergence.
    Updating,
    /// Delete issued; waiting for the resource to disappear.
    Deleting,
    /// Deletion converged; the identifier is no longer valid.
    Gone,
    /// Create failed terminally.
    CreateFailed,
    /// Delete failed terminally.
    DeleteFailed,
}

impl fmt::Display for ResourcePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Propagating => "propagating",
            Self::Ready => "ready",
            Self::Updating => "updating",
            Self::Deleting => "deleting",
            Self::Gone => "gone",
            Self::CreateFailed => "create failed",
            Self::DeleteFailed => "delete failed",
        };
        f.write_str(name)
    }
}

/// Describes how one kind of remote resource is identified, observed, and
/// classified. Orchestrators are constructed per profile.
#[derive(Clone, Debug)]
pub struct ResourceProfile {
    /// Human-readable resource kind, used in errors and remote requests.
    pub kind: String,
    /// Identifier encoding for this kind.
    pub scheme: IdScheme,
    /// Number of identifier components.
    pub component_count: usize,
    /// Statuses meaning the resource has converged after a mutation. Kinds
    /// with no asynchronous propagation leave this empty and skip waits.
    pub ready_statuses: Vec<StatusTag>,
    /// Statuses meaning the remote system failed terminally.
    pub failed_statuses: Vec<StatusTag>,
    /// Whether absence observed while waiting for deletion counts as
    /// convergence.
    pub deletion_absence_converges: bool,
    /// Whether the resource supports tagging.
    pub supports_tags: bool,
    /// Per-operation error classification rules.
    pub classifiers: OperationClassifiers,
}

impl ResourceProfile {
    /// Creates a profile with no status tracking, no tag support, and
    /// default classifiers.
    #[must_use]
    pub fn new(kind: impl Into<String>, scheme: IdScheme, component_count: usize) -> Self {
        Self {
            kind: kind.into(),
            scheme,
            component_count,
            ready_statuses: Vec::new(),
            failed_statuses: Vec::new(),
            deletion_absence_converges: true,
            supports_tags: false,
            classifiers: OperationClassifiers::default(),
        }
    }

    /// Sets the statuses that mean the resource has converged.
    #[must_use]
    pub fn ready_on<I, S>(mut self, statuses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<StatusTag>,
    {
        self.ready_statuses = statuses.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the statuses that mean the remote system failed terminally.
    #[must_use]
    pub fn failed_on<I, S>(mut self, statuses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<StatusTag>,
    {
        self.failed_statuses = statuses.into_iter().map(Into::into).collect();
        self
    }

    /// Sets whether absence during a deletion wait counts as convergence.
    #[must_use]
    pub fn with_deletion_absence_converges(mut self, converges: bool) -> Self {
        self.deletion_absence_converges = converges;
        self
    }

    /// Marks the resource kind as taggable.
    #[must_use]
    pub fn with_tagging(mut self, supported: bool) -> Self {
        self.supports_tags = supported;
        self
    }

    /// Replaces the per-operation classifiers.
    #[must_use]
    pub fn with_classifiers(mut self, classifiers: OperationClassifiers) -> Self {
        self.classifiers = classifiers;
        self
    }

    /// Whether this kind propagates asynchronously and therefore needs
    /// convergence waits.
    #[must_use]
    pub fn tracks_status(&self) -> bool {
        !self.ready_statuses.is_empty()
    }
}

/// Declared desired state for a single resource, supplied by the
/// surrounding schema layer.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DesiredResource {
    /// Creation parameters passed through to the remote API.
    pub parameters: ParameterSet,
    /// Tags to attach at creation time.
    pub tags: TagSet,
    /// Optional parent/member association carried by this resource.
    pub association: Option<AssociationSpec>,
}

impl DesiredResource {
    /// Builds a desired state from creation parameters.
    #[must_use]
    pub fn new(parameters: ParameterSet) -> Self {
        Self {
            parameters,
            tags: TagSet::new(),
            association: None,
        }
    }

    /// Attaches creation-time tags.
    #[must_use]
    pub fn with_tags(mut self, tags: TagSet) -> Self {
        self.tags = tags;
        self
    }

    /// Declares the resource as a parent/member association.
    #[must_use]
    pub fn with_association(mut self, association: AssociationSpec) -> Self {
        self.association = Some(association);
        self
    }
}

/// Parent/member association requested at create time.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AssociationSpec {
    /// Identifier of the parent hosting the relationship set.
    pub parent_id: String,
    /// Member to associate with the parent.
    pub member_id: String,
    /// Existing default member to replace. When set, the orchestrator
    /// validates the default is currently associated, adds the new member,
    /// and only then removes the default.
    pub replace_default_member: Option<String>,
}

impl AssociationSpec {
    /// Builds an association between `parent_id` and `member_id`.
    #[must_use]
    pub fn new(parent_id: impl Into<String>, member_id: impl Into<String>) -> Self {
        Self {
            parent_id: parent_id.into(),
            member_id: member_id.into(),
            replace_default_member: None,
        }
    }

    /// Requests that the given default member be replaced by this one.
    #[must_use]
    pub fn replacing_default(mut self, default_member: impl Into<String>) -> Self {
        self.replace_default_member = Some(default_member.into());
        self
    }

    pub(crate) fn validate(&self) -> Result<(), EngineError> {
        if self.parent_id.trim().is_empty() {
            return Err(EngineError::validation("association parent_id is empty"));
        }
        if self.member_id.trim().is_empty() {
            return Err(EngineError::validation("association member_id is empty"));
        }
        if let Some(default_member) = &self.replace_default_member {
            if default_member.trim().is_empty() {
                return Err(EngineError::validation(
                    "association replace_default_member is empty",
                ));
            }
            if default_member == &self.member_id {
                return Err(EngineError::validation(format!(
                    "'{}' is already the default member of '{}'",
                    self.member_id, self.parent_id
                )));
            }
        }
        Ok(())
    }
}

/// Result of a successful create, including any non-fatal compensation
/// failure.
#[derive(Clone, Debug, PartialEq)]
pub struct CreateOutcome {
    /// Encoded identifier of the created resource.
    pub id: String,
    /// Lifecycle phase reached by the create flow.
    pub phase: ResourcePhase,
    /// Last state observed during the convergence wait, when one ran.
    pub state: Option<RemoteState>,
    /// Error from the remove-old compensation step when the new association
    /// was created but the replaced default could not be removed. The
    /// resource itself was created; the caller retries the removal.
    pub compensation_failure: Option<EngineError>,
}
