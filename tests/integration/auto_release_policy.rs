//! Integration tests for stale-lock reclamation during acquire

use std::fs;
use std::sync::Arc;
use tempfile::TempDir;
use vfs_item_lock::backend::local::LocalBackend;
use vfs_item_lock::{
    AcquireOutcome, AutoReleasePolicy, BackendOptions, CallerRole, LockManager, LockToken,
};

fn local_manager() -> LockManager {
    LockManager::new(Arc::new(LocalBackend::new()))
}

/// A holder token carrying this host's identity and a fixed timestamp, so
/// `same_node_only` checks pass deterministically in any environment.
fn local_origin_token(timestamp: i64) -> String {
    let fresh = LockToken::fresh();
    format!("1:{}:{}:{timestamp}", fresh.hostname(), fresh.host_ip())
}

#[test]
fn test_expired_same_node_lock_is_reclaimed_but_not_granted() {
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("a.csv");
    fs::write(&target, b"payload").unwrap();
    let sidecar = dir.path().join("a.csv.lock");
    fs::write(&sidecar, local_origin_token(1000)).unwrap();
    let uri = format!("file://{}", target.display());

    let manager = local_manager();
    let policy = AutoReleasePolicy::same_node(1000);
    let outcome = manager.acquire(&uri, &BackendOptions::default(), Some(&policy), CallerRole::Listener);

    // the reclaiming call itself never gets the lock
    assert_eq!(outcome, AcquireOutcome::NotAcquired);
    assert!(!sidecar.exists());

    // the next poll tick finds the file free
    let retry = manager.acquire(&uri, &BackendOptions::default(), Some(&policy), CallerRole::Listener);
    assert_eq!(retry, AcquireOutcome::Acquired);
}

#[test]
fn test_foreign_lock_survives_same_node_policy() {
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("a.csv");
    fs::write(&target, b"payload").unwrap();
    let sidecar = dir.path().join("a.csv.lock");
    fs::write(&sidecar, b"1:hostB:10.255.0.1:1000").unwrap();
    let uri = format!("file://{}", target.display());

    let policy = AutoReleasePolicy::same_node(1000);
    let outcome =
        local_manager().acquire(&uri, &BackendOptions::default(), Some(&policy), CallerRole::Listener);
    assert_eq!(outcome, AcquireOutcome::NotAcquired);
    assert!(sidecar.exists());
}

#[test]
fn test_young_lock_survives_age_threshold() {
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("a.csv");
    fs::write(&target, b"payload").unwrap();
    let sidecar = dir.path().join("a.csv.lock");
    let now = LockToken::fresh().timestamp_millis().unwrap();
    fs::write(&sidecar, local_origin_token(now)).unwrap();
    let uri = format!("file://{}", target.display());

    let policy = AutoReleasePolicy::same_node(3_600_000);
    let outcome =
        local_manager().acquire(&uri, &BackendOptions::default(), Some(&policy), CallerRole::Listener);
    assert_eq!(outcome, AcquireOutcome::NotAcquired);
    assert!(sidecar.exists());
}

#[test]
fn test_disabled_auto_release_leaves_stale_lock() {
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("a.csv");
    fs::write(&target, b"payload").unwrap();
    let sidecar = dir.path().join("a.csv.lock");
    fs::write(&sidecar, local_origin_token(1000)).unwrap();
    let uri = format!("file://{}", target.display());

    let outcome = local_manager().acquire(&uri, &BackendOptions::default(), None, CallerRole::Listener);
    assert_eq!(outcome, AcquireOutcome::NotAcquired);
    assert!(sidecar.exists());
}
