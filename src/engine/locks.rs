//! Per-parent lock registry serialising shared relationship-set mutations.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Registry of asynchronous locks keyed by parent identifier.
///
/// Operations that read-modify-write a shared parent's relationship set are
/// not safe under concurrent writers at the remote API, so the orchestrator
/// holds the parent's lock for the duration of the sequence. Guards release
/// on every exit path, including cancellation, when they drop. Locks for
/// unrelated parents never contend.
#[derive(Debug, Default)]
pub struct LockRegistry {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl LockRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the lock for `key`, creating it on first use.
    pub async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            Arc::clone(locks.entry(key.to_owned()).or_default())
        };
        lock.lock_owned().await
    }
}
