//! Integration tests for fail-marker records

use std::fs;
use std::sync::Arc;
use tempfile::TempDir;
use vfs_item_lock::backend::local::LocalBackend;
use vfs_item_lock::{BackendOptions, CallerRole, LockManager};

fn local_manager() -> LockManager {
    LockManager::new(Arc::new(LocalBackend::new()))
}

#[test]
fn test_mark_query_clear_round_trip() {
    let dir = TempDir::new().unwrap();
    let uri = format!("file://{}", dir.path().join("a.csv").display());
    let options = BackendOptions::default();

    let manager = local_manager();
    manager.mark_fail(&uri, &options);
    assert!(manager.is_fail(&uri, &options));

    manager.release_fail(&uri, &options);
    assert!(!manager.is_fail(&uri, &options));
}

#[test]
fn test_marker_holds_millis_epoch_metadata() {
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("a.csv");
    let uri = format!("file://{}", target.display());
    let options = BackendOptions::default();

    local_manager().mark_fail(&uri, &options);
    let content = fs::read_to_string(dir.path().join("a.csv.fail")).unwrap();
    // presence is the signal, content is advisory metadata
    assert!(content.parse::<i64>().unwrap() > 0);
}

#[test]
fn test_fail_marker_does_not_block_acquire() {
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("a.csv");
    fs::write(&target, b"payload").unwrap();
    let uri = format!("file://{}", target.display());
    let options = BackendOptions::default();

    let manager = local_manager();
    manager.mark_fail(&uri, &options);

    // advisory only: a caller that ignores the marker still gets the lock
    assert!(manager
        .acquire(&uri, &options, None, CallerRole::Listener)
        .is_acquired());
}

#[test]
fn test_query_string_is_ignored_for_marker_resolution() {
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("a.csv");
    let options = BackendOptions::default();

    let manager = local_manager();
    manager.mark_fail(
        &format!("file://{}?vfs.passive=true", target.display()),
        &options,
    );
    assert!(dir.path().join("a.csv.fail").exists());
    assert!(manager.is_fail(&format!("file://{}", target.display()), &options));
}
