//! Remote API capability consumed by the reconciliation engine.
//!
//! The engine never talks to a provider directly; it drives an abstract
//! [`RemoteApi`] whose operations return either a result or a provider
//! error tagged with a code and message. Transport and authentication live
//! behind implementations of this trait.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::tags::TagSet;

/// Error returned by the remote system, tagged with a provider-defined code
/// and message.
#[derive(Clone, Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
#[error("{code}: {message}")]
pub struct RemoteError {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

impl RemoteError {
    /// Constructs a remote error from a code and message.
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Opaque status tag reported by the remote system for a resource.
///
/// Status vocabularies are resource specific; the engine only compares tags
/// against the sets declared by a resource profile.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct StatusTag(String);

impl StatusTag {
    /// Wraps a raw status string.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the raw status string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for StatusTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for StatusTag {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for StatusTag {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl AsRef<str> for StatusTag {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Explicit value type for string-keyed resource parameters and attributes.
///
/// Provider-specific pass-through fields are modelled as opaque JSON values
/// rather than an untyped dynamic structure.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct ParameterSet(BTreeMap<String, Value>);

impl ParameterSet {
    /// Creates an empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a parameter.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Inserts a parameter, consuming and returning the set.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    /// Returns the value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns the value under `key` when it is a string.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Returns the value under `key` when it is an array of strings.
    ///
    /// Non-string elements are skipped.
    #[must_use]
    pub fn get_str_list(&self, key: &str) -> Option<Vec<String>> {
        self.get(key).and_then(Value::as_array).map(|values| {
            values
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect()
        })
    }

    /// Number of parameters in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set holds no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Iterates over entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Returns the entries of `self` whose values differ from, or are absent
    /// in, `baseline`.
    ///
    /// Used to send only changed fields on update so concurrently modified
    /// unrelated fields are not clobbered.
    #[must_use]
    pub fn changed_from(&self, baseline: &Self) -> Self {
        let changed = self
            .0
            .iter()
            .filter(|(key, value)| baseline.get(key) != Some(value))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        Self(changed)
    }
}

impl FromIterator<(String, Value)> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Most recently observed remote state of a resource.
///
/// Fetched fresh on every poll and never cached beyond one poll cycle.
#[derive(Clone, Debug, PartialEq)]
pub struct RemoteState {
    /// Status tag reported by the remote system.
    pub status: StatusTag,
    /// Opaque attributes reported alongside the status.
    pub attributes: ParameterSet,
    /// Last error the remote system reported for the resource, if any.
    pub last_error: Option<RemoteError>,
}

impl RemoteState {
    /// Constructs a state with the given status and no attributes.
    #[must_use]
    pub fn new(status: impl Into<StatusTag>) -> Self {
        Self {
            status: status.into(),
            attributes: ParameterSet::new(),
            last_error: None,
        }
    }

    /// Attaches attributes, consuming and returning the state.
    #[must_use]
    pub fn with_attributes(mut self, attributes: ParameterSet) -> Self {
        self.attributes = attributes;
        self
    }

    /// Attaches the last reported remote error.
    #[must_use]
    pub fn with_last_error(mut self, error: RemoteError) -> Self {
        self.last_error = Some(error);
        self
    }
}

/// Request issued for a remote create call.
#[derive(Clone, Debug, PartialEq)]
pub struct CreateRequest {
    /// Resource kind being created.
    pub kind: String,
    /// Creation parameters passed through to the provider.
    pub parameters: ParameterSet,
    /// Tags to attach at creation time.
    pub tags: TagSet,
    /// Token covering the logical create across retries, so a retried call
    /// does not duplicate the side effect.
    pub idempotency_token: String,
}

/// Response to a successful remote create call.
#[derive(Clone, Debug, PartialEq)]
pub struct CreateResponse {
    /// Identifier components assigned by the remote system, in order.
    pub id_components: Vec<String>,
    /// Initial state, when the provider reports one with the response.
    pub state: Option<RemoteState>,
}

/// Future returned by remote API operations.
pub type RemoteFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, RemoteError>> + Send + 'a>>;

/// Abstract remote API driven by the reconciliation engine.
///
/// `read_resource` returns `Ok(None)` when the remote system cleanly reports
/// the resource absent; providers that signal absence through an error code
/// instead rely on the per-operation classifier mapping that code to
/// not-found.
pub trait RemoteApi: Send + Sync {
    /// Creates a resource and returns its identifier components.
    fn create_resource<'a>(
        &'a self,
        request: &'a CreateRequest,
    ) -> RemoteFuture<'a, CreateResponse>;

    /// Fetches the current state of the resource at `components`.
    fn read_resource<'a>(
        &'a self,
        components: &'a [String],
    ) -> RemoteFuture<'a, Option<RemoteState>>;

    /// Applies the changed fields in `changes` to the resource.
    fn update_resource<'a>(
        &'a self,
        components: &'a [String],
        changes: &'a ParameterSet,
    ) -> RemoteFuture<'a, Option<RemoteState>>;

    /// Deletes the resource at `components`.
    fn delete_resource<'a>(&'a self, components: &'a [String]) -> RemoteFuture<'a, ()>;

    /// Lists the tags currently attached to the resource.
    fn list_tags<'a>(&'a self, components: &'a [String]) -> RemoteFuture<'a, TagSet>;

    /// Creates or updates the given tags on the resource.
    fn tag_resource<'a>(
        &'a self,
        components: &'a [String],
        tags: &'a TagSet,
    ) -> RemoteFuture<'a, ()>;

    /// Removes the given tag keys from the resource.
    fn untag_resource<'a>(
        &'a self,
        components: &'a [String],
        keys: &'a [String],
    ) -> RemoteFuture<'a, ()>;
}
