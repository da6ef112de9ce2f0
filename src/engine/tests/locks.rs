//! Tests for the per-parent lock registry.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, timeout};

use crate::engine::LockRegistry;

#[tokio::test]
async fn same_key_is_mutually_exclusive() {
    let registry = Arc::new(LockRegistry::new());
    let guard = registry.acquire("vpce-1").await;

    let contender = {
        let registry = Arc::clone(&registry);
        tokio::spawn(async move {
            let _guard = registry.acquire("vpce-1").await;
        })
    };

    sleep(Duration::from_millis(20)).await;
    assert!(!contender.is_finished(), "second acquire should block");

    drop(guard);
    timeout(Duration::from_secs(1), contender)
        .await
        .expect("contender should finish once the guard drops")
        .expect("contender task should not panic");
}

#[tokio::test]
async fn distinct_keys_do_not_contend() {
    let registry = LockRegistry::new();
    let _held = registry.acquire("vpce-1").await;

    let _other = timeout(Duration::from_secs(1), registry.acquire("vpce-2"))
        .await
        .expect("unrelated parent should not block");
}

#[tokio::test]
async fn guard_drop_releases_for_the_next_waiter() {
    let registry = LockRegistry::new();
    {
        let _guard = registry.acquire("vpce-1").await;
    }
    let _reacquired = timeout(Duration::from_secs(1), registry.acquire("vpce-1"))
        .await
        .expect("released lock should be reacquirable");
}
