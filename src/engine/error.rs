//! Error taxonomy for the resource orchestrator.

use std::fmt;

use thiserror::Error;

use crate::ident::IdentifierError;
use crate::poll::PollError;
use crate::remote::{RemoteError, StatusTag};
use crate::retry::RetryError;
use crate::tags::TagError;

/// Remote operation attempted by the orchestrator, retained for error
/// context.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Operation {
    /// Remote resource creation.
    Create,
    /// Remote state fetch.
    Read,
    /// Remote in-place update.
    Update,
    /// Remote deletion.
    Delete,
    /// Tag reconciliation.
    TagSync,
    /// Removing the replaced default member after an association create.
    ReplaceDefaultMember,
    /// Restoring the default member during an association delete.
    RestoreDefaultMember,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::TagSync => "tag sync",
            Self::ReplaceDefaultMember => "replace default member",
            Self::RestoreDefaultMember => "restore default member",
        };
        f.write_str(name)
    }
}

/// Errors surfaced by orchestrator operations.
///
/// Every variant retains the operation attempted, the identifier involved,
/// and the underlying remote error where one exists, so a failure can be
/// diagnosed without re-running the reconciliation.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum EngineError {
    /// Raised when an identifier cannot be encoded or decoded.
    #[error(transparent)]
    Identifier(#[from] IdentifierError),
    /// Raised when a precondition fails before any remote mutation.
    #[error("validation failed: {message}")]
    Validation {
        /// Description of the violated precondition.
        message: String,
    },
    /// Raised when the remote system reports the resource absent. Callers
    /// prune local state for resources deleted out of band.
    #[error("{kind} '{id}' not found")]
    NotFound {
        /// Resource kind from the profile.
        kind: String,
        /// Identifier whose components did not resolve.
        id: String,
    },
    /// Raised for non-retryable remote failures.
    #[error("remote {operation} failed for {kind} '{id}': {source}")]
    Remote {
        /// Operation being attempted.
        operation: Operation,
        /// Resource kind from the profile.
        kind: String,
        /// Identifier involved.
        id: String,
        /// Error returned by the remote system.
        source: RemoteError,
    },
    /// Raised when the remote system converges on a failure status.
    #[error("{operation} left {kind} '{id}' in failure status '{status}'{}", format_remote(last_error.as_ref()))]
    FailedState {
        /// Operation being attempted.
        operation: Operation,
        /// Resource kind from the profile.
        kind: String,
        /// Identifier involved.
        id: String,
        /// Failure status observed.
        status: StatusTag,
        /// Remote error reported alongside the status, if any.
        last_error: Option<RemoteError>,
    },
    /// Raised when a deadline passed while retrying or waiting for
    /// convergence; carries the most recent observation for diagnostics.
    #[error("{operation} timed out for {kind} '{id}'; last observed status: {}{}", format_status(last_status.as_ref()), format_remote(last_error.as_ref()))]
    Timeout {
        /// Operation being attempted.
        operation: Operation,
        /// Resource kind from the profile.
        kind: String,
        /// Identifier involved.
        id: String,
        /// Last non-terminal status observed, if any.
        last_status: Option<StatusTag>,
        /// Last remote error observed, if any.
        last_error: Option<RemoteError>,
    },
    /// Raised when the caller's cancellation signal fired.
    #[error("{operation} aborted for {kind} '{id}'")]
    Aborted {
        /// Operation being attempted.
        operation: Operation,
        /// Resource kind from the profile.
        kind: String,
        /// Identifier involved.
        id: String,
    },
    /// Raised when tag reconciliation fails.
    #[error("tag reconciliation failed for {kind} '{id}': {source}")]
    Tags {
        /// Resource kind from the profile.
        kind: String,
        /// Identifier involved.
        id: String,
        /// Underlying tag application error.
        source: TagError,
    },
}

fn format_status(status: Option<&StatusTag>) -> String {
    status.map_or_else(|| String::from("none"), ToString::to_string)
}

fn format_remote(error: Option<&RemoteError>) -> String {
    error.map_or_else(String::new, |remote| format!("; last remote error: {remote}"))
}

impl EngineError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Maps a retry outcome into engine context.
    pub(crate) fn from_retry(operation: Operation, kind: &str, id: &str, error: RetryError) -> Self {
        match error {
            RetryError::Aborted => Self::Aborted {
                operation,
                kind: kind.to_owned(),
                id: id.to_owned(),
            },
            RetryError::Permanent(source) => Self::Remote {
                operation,
                kind: kind.to_owned(),
                id: id.to_owned(),
                source,
            },
            RetryError::NotFound(_) => Self::NotFound {
                kind: kind.to_owned(),
                id: id.to_owned(),
            },
            RetryError::TimedOut { last_error } => Self::Timeout {
                operation,
                kind: kind.to_owned(),
                id: id.to_owned(),
                last_status: None,
                last_error: Some(last_error),
            },
        }
    }

    /// Maps a convergence-wait outcome into engine context.
    pub(crate) fn from_poll(operation: Operation, kind: &str, id: &str, error: PollError) -> Self {
        match error {
            PollError::NotFound => Self::NotFound {
                kind: kind.to_owned(),
                id: id.to_owned(),
            },
            PollError::Failed { state } => Self::FailedState {
                operation,
                kind: kind.to_owned(),
                id: id.to_owned(),
                status: state.status,
                last_error: state.last_error,
            },
            PollError::TimedOut { last_state } => {
                let (last_status, last_error) = last_state
                    .map_or((None, None), |state| (Some(state.status), state.last_error));
                Self::Timeout {
                    operation,
                    kind: kind.to_owned(),
                    id: id.to_owned(),
                    last_status,
                    last_error,
                }
            }
            PollError::Aborted => Self::Aborted {
                operation,
                kind: kind.to_owned(),
                id: id.to_owned(),
            },
            PollError::Fetch(retry) => Self::from_retry(operation, kind, id, retry),
        }
    }
}
