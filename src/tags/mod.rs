//! Tag set reconciliation against the remote system.
//!
//! Both the remote system and the declared configuration own a key/value tag
//! set independently. Reconciliation computes a one-shot diff and applies it
//! with at most one combined set call and one remove call; no state is
//! retained between calls.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::remote::{RemoteApi, RemoteError};

/// String key/value tag mapping with unique keys; order is irrelevant.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct TagSet(BTreeMap<String, String>);

impl TagSet {
    /// Creates an empty tag set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a tag.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Inserts a tag, consuming and returning the set.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Returns the value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Whether a tag with `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of tags in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set holds no tags.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Iterates over entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Returns the union of `self` and `other`; `other` wins on key clashes.
    #[must_use]
    pub fn merged(&self, other: &Self) -> Self {
        let mut merged = self.clone();
        for (key, value) in other.iter() {
            merged.insert(key, value);
        }
        merged
    }
}

impl FromIterator<(String, String)> for TagSet {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for TagSet {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.to_owned(), value.to_owned()))
                .collect(),
        )
    }
}

/// Minimal mutation set produced by [`TagReconciler::diff`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TagDiff {
    /// Tags present in the desired set but absent remotely.
    pub to_create: TagSet,
    /// Tags present in both sets with differing values.
    pub to_update: TagSet,
    /// Keys present remotely but no longer desired.
    pub to_delete: Vec<String>,
}

impl TagDiff {
    /// Whether applying the diff would issue no remote calls.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.to_create.is_empty() && self.to_update.is_empty() && self.to_delete.is_empty()
    }

    /// Combined create and update set sent in the single remote set call.
    #[must_use]
    pub fn to_set(&self) -> TagSet {
        self.to_create.merged(&self.to_update)
    }
}

/// Errors surfaced while applying a tag diff.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum TagError {
    /// Raised when the combined create/update call fails.
    #[error("tag set call failed: {source}")]
    Set {
        /// Error returned by the remote system.
        source: RemoteError,
    },
    /// Raised when the remove call fails after the set call succeeded. The
    /// additions already applied remain in effect; the caller is expected to
    /// retry the reconciliation rather than roll back.
    #[error("tag remove call failed after {retained} tags were set: {source}")]
    Remove {
        /// Number of tags applied by the preceding set call.
        retained: usize,
        /// Error returned by the remote system.
        source: RemoteError,
    },
}

/// Computes and applies minimal tag mutations, never deleting keys the
/// remote system manages under the reserved prefix.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TagReconciler {
    reserved_prefix: String,
}

impl TagReconciler {
    /// Creates a reconciler protecting keys under `reserved_prefix`.
    #[must_use]
    pub fn new(reserved_prefix: impl Into<String>) -> Self {
        Self {
            reserved_prefix: reserved_prefix.into(),
        }
    }

    /// Returns the protected key prefix.
    #[must_use]
    pub fn reserved_prefix(&self) -> &str {
        &self.reserved_prefix
    }

    /// Computes the one-shot diff of the remote tag set against the desired
    /// one.
    ///
    /// Keys under the reserved prefix are owned by the remote system and are
    /// never scheduled for deletion, even when absent from the desired set.
    #[must_use]
    pub fn diff(&self, current: &TagSet, desired: &TagSet) -> TagDiff {
        let mut diff = TagDiff::default();
        for (key, value) in desired.iter() {
            match current.get(key) {
                None => diff.to_create.insert(key, value),
                Some(existing) if existing != value => diff.to_update.insert(key, value),
                Some(_) => {}
            }
        }
        for key in current.keys() {
            if !desired.contains_key(key) && !key.starts_with(&self.reserved_prefix) {
                diff.to_delete.push(key.to_owned());
            }
        }
        diff
    }

    /// Applies the diff with at most one set call and one remove call; a
    /// no-op diff issues no remote calls.
    ///
    /// # Errors
    ///
    /// Returns [`TagError::Set`] when the combined create/update call fails
    /// and [`TagError::Remove`] when the remove call fails after a
    /// successful set; in the latter case the additions remain in effect.
    pub async fn apply<R: RemoteApi>(
        &self,
        remote: &R,
        components: &[String],
        diff: &TagDiff,
    ) -> Result<(), TagError> {
        let to_set = diff.to_set();
        if !to_set.is_empty() {
            remote
                .tag_resource(components, &to_set)
                .await
                .map_err(|source| TagError::Set { source })?;
        }
        if !diff.to_delete.is_empty() {
            if let Err(source) = remote.untag_resource(components, &diff.to_delete).await {
                return Err(TagError::Remove {
                    retained: to_set.len(),
                    source,
                });
            }
        }
        if !diff.is_noop() {
            debug!(
                set = to_set.len(),
                removed = diff.to_delete.len(),
                "tag reconciliation applied"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
