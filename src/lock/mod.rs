//! Lock acquisition protocol
//!
//! Mutual exclusion on an individual file using only the file space itself
//! as the rendezvous: a `.lock` sidecar next to the target file, containing
//! the holder's [`LockToken`](crate::token::LockToken). There is no broker
//! and no database, so acquisition is a create-then-verify handshake:
//!
//! 1. If the sidecar already exists, another party is processing the file
//!    (or is still uploading it): back off, optionally running the
//!    [`auto_release`] policy against the suspect sidecar.
//! 2. Otherwise create the sidecar and write the local token into it.
//! 3. Re-resolve the sidecar with a fresh handle and compare content
//!    byte-for-byte, including an end-of-file check. Two parties can
//!    observe "no sidecar" concurrently and both create; last writer wins
//!    on content, and the verify step is the resolution.
//!
//! The handshake is not linearizable: on backends without an atomic
//! exclusive-create primitive a narrow two-winner window remains. Within a
//! process, every acquire runs inside a single critical section owned by
//! the [`LockManager`], which keeps the verify step honest against
//! same-process races.

pub mod auto_release;

pub use auto_release::AutoReleasePolicy;

use crate::backend::{close_quietly, BackendError, FileHandle, FileSystemBackend};
use crate::options::BackendOptions;
use crate::token::LockToken;
use crate::uri;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, error, warn};

/// Suffix appended to the canonical path to derive the lock sidecar
pub const LOCK_FILE_SUFFIX: &str = ".lock";

/// Outcome of an acquire attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// The lock sidecar exists and this process wrote it
    Acquired,
    /// The file is claimed elsewhere, vanished, or the backend failed;
    /// the caller retries on its next poll tick
    NotAcquired,
}

impl AcquireOutcome {
    /// Whether the lock was acquired
    pub fn is_acquired(self) -> bool {
        matches!(self, AcquireOutcome::Acquired)
    }
}

/// The role of the party requesting a lock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallerRole {
    /// Polls an inbound location and consumes files others deposited
    Listener,
    /// Deposits outbound files for another party to consume
    Sender,
}

/// Coordinator for sidecar-based file-item locking
///
/// Holds the injected file-system backend and the process-wide critical
/// section serializing every acquire (and fail-mark, see
/// [`crate::failmark`]) in this process.
pub struct LockManager {
    pub(crate) backend: Arc<dyn FileSystemBackend>,
    pub(crate) gate: Mutex<()>,
}

impl LockManager {
    /// Create a manager over an injected backend
    ///
    /// The backend's lifecycle is owned by the enclosing runtime; the
    /// manager only borrows a shared reference.
    pub fn new(backend: Arc<dyn FileSystemBackend>) -> Self {
        Self {
            backend,
            gate: Mutex::new(()),
        }
    }

    /// Acquire the file-item lock for `target_uri`
    ///
    /// Returns [`AcquireOutcome::Acquired`] when the handshake succeeded
    /// and this process now owns the sidecar. Every failure (an existing
    /// claim, a vanished listener target, a lost race, a backend error)
    /// collapses to [`AcquireOutcome::NotAcquired`] with a log record;
    /// callers poll on a fixed cadence and cannot usefully react to the
    /// distinction.
    ///
    /// When `auto_release` is supplied and an existing sidecar is found,
    /// the stale-lock policy runs against it. That never hands the lock to
    /// this call; at best the next poll tick finds the sidecar gone.
    pub fn acquire(
        &self,
        target_uri: &str,
        options: &BackendOptions,
        auto_release: Option<&AutoReleasePolicy>,
        role: CallerRole,
    ) -> AcquireOutcome {
        let _serialized = self.enter_critical_section();

        let local = LockToken::fresh();
        let token_bytes = local.to_string().into_bytes();
        let canonical = uri::canonical(target_uri);
        let lock_uri = format!("{canonical}{LOCK_FILE_SUFFIX}");

        let mut sidecar = match self.backend.resolve(&lock_uri, options) {
            Ok(handle) => handle,
            Err(e) => {
                error!(
                    "cannot get the lock for {} before processing: {e}",
                    uri::mask_password(target_uri)
                );
                return AcquireOutcome::NotAcquired;
            }
        };

        match self.run_handshake(
            sidecar.as_mut(),
            canonical,
            options,
            &local,
            &token_bytes,
            auto_release,
            role,
        ) {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(
                    "cannot get the lock for {} before processing: {e}",
                    uri::mask_password(target_uri)
                );
                // reclaim the backend connection serving the sidecar, or
                // chronic errors accumulate handles without bound
                if let Err(close_err) = sidecar.close_filesystem() {
                    warn!("unable to close the lock sidecar's parent file system: {close_err}");
                }
                AcquireOutcome::NotAcquired
            }
        }
    }

    /// Release the file-item lock for `target_uri`
    ///
    /// Idempotent: deleting an absent sidecar is a no-op. Backend errors
    /// are logged with the password-masked URI and swallowed.
    pub fn release(&self, target_uri: &str, options: &BackendOptions) {
        let canonical = uri::canonical(target_uri);
        let lock_uri = format!("{canonical}{LOCK_FILE_SUFFIX}");
        if let Err(e) = self.delete_if_present(&lock_uri, options) {
            error!(
                "couldn't release the lock for {} after processing: {e}",
                uri::mask_password(target_uri)
            );
        }
    }

    pub(crate) fn enter_critical_section(&self) -> MutexGuard<'_, ()> {
        match self.gate.lock() {
            Ok(guard) => guard,
            // a panic while holding the gate poisons it; the protocol state
            // lives in the file space, not behind the mutex, so continue
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub(crate) fn delete_if_present(
        &self,
        sidecar_uri: &str,
        options: &BackendOptions,
    ) -> Result<(), BackendError> {
        let mut sidecar = self.backend.resolve(sidecar_uri, options)?;
        if sidecar.exists()? {
            sidecar.delete()?;
        }
        close_quietly(sidecar.as_mut());
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn run_handshake(
        &self,
        sidecar: &mut dyn FileHandle,
        canonical: &str,
        options: &BackendOptions,
        local: &LockToken,
        token_bytes: &[u8],
        auto_release: Option<&AutoReleasePolicy>,
        role: CallerRole,
    ) -> Result<AcquireOutcome, BackendError> {
        if sidecar.exists()? {
            debug!(
                "existing lock on {}: another party is processing this file or it is still being uploaded",
                uri::mask_password(canonical)
            );
            if let Some(policy) = auto_release {
                auto_release::reclaim_stale(policy, sidecar, local);
            }
            return Ok(AcquireOutcome::NotAcquired);
        }

        if role == CallerRole::Listener {
            // the target may have been consumed between the directory scan
            // and this call; don't leave an orphan sidecar behind
            let mut target = self.backend.resolve(canonical, options)?;
            let target_exists = target.exists()?;
            close_quietly(target.as_mut());
            if !target_exists {
                return Ok(AcquireOutcome::NotAcquired);
            }
        }

        if !write_lock_sidecar(sidecar, token_bytes, canonical)? {
            return Ok(AcquireOutcome::NotAcquired);
        }

        // fresh handle: the verify must observe the backend's current
        // content, not anything cached on the handle we wrote through
        let mut verifier = self.backend.resolve(sidecar.uri(), options)?;
        let confirmed = verifier.exists()? && holds_exactly(verifier.as_mut(), token_bytes)?;
        close_quietly(verifier.as_mut());
        if confirmed {
            Ok(AcquireOutcome::Acquired)
        } else {
            // the rightful holder owns the sidecar now; leave it alone
            Ok(AcquireOutcome::NotAcquired)
        }
    }
}

/// Create the sidecar and write the holder token into it
///
/// Returns `Ok(false)` when the content write failed and the partial
/// sidecar was removed; creation failures propagate. The handle is closed
/// on every path.
fn write_lock_sidecar(
    sidecar: &mut dyn FileHandle,
    token_bytes: &[u8],
    canonical: &str,
) -> Result<bool, BackendError> {
    sidecar.create()?;
    let written = match sidecar.write_all(token_bytes) {
        Ok(()) => true,
        Err(e) => {
            error!(
                "couldn't create the lock file before processing the file {}: {e}",
                uri::mask_password(canonical)
            );
            if let Err(delete_err) = sidecar.delete() {
                warn!("unable to remove the partially written lock sidecar: {delete_err}");
            }
            false
        }
    };
    close_quietly(sidecar);
    Ok(written)
}

/// Whether the sidecar content is exactly `token_bytes`
///
/// Reads one byte past the token length so a racing writer that appended a
/// superset fails the end-of-file check.
fn holds_exactly(sidecar: &mut dyn FileHandle, token_bytes: &[u8]) -> Result<bool, BackendError> {
    let head = sidecar.read_head(token_bytes.len() + 1)?;
    if head == token_bytes {
        Ok(true)
    } else {
        debug!("the lock has been acquired by another party");
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::local::LocalBackend;
    use std::fs;
    use tempfile::TempDir;

    fn manager() -> LockManager {
        LockManager::new(Arc::new(LocalBackend::new()))
    }

    fn options() -> BackendOptions {
        BackendOptions::default()
    }

    #[test]
    fn test_fresh_acquire_writes_token_sidecar() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("a.csv");
        fs::write(&target, b"payload").unwrap();
        let uri = format!("file://{}", target.display());

        let outcome = manager().acquire(&uri, &options(), None, CallerRole::Sender);
        assert!(outcome.is_acquired());

        let sidecar = dir.path().join("a.csv.lock");
        let content = fs::read_to_string(&sidecar).unwrap();
        let token = LockToken::parse(&content).unwrap();
        assert!(token.timestamp_millis().is_some());
    }

    #[test]
    fn test_acquire_strips_query_for_sidecar_derivation() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("a.csv");
        fs::write(&target, b"payload").unwrap();
        let uri = format!("file://{}?vfs.passive=true", target.display());

        let outcome = manager().acquire(&uri, &options(), None, CallerRole::Sender);
        assert!(outcome.is_acquired());
        assert!(dir.path().join("a.csv.lock").exists());
    }

    #[test]
    fn test_listener_guard_refuses_missing_target() {
        let dir = TempDir::new().unwrap();
        let uri = format!("file://{}", dir.path().join("gone.csv").display());

        let outcome = manager().acquire(&uri, &options(), None, CallerRole::Listener);
        assert_eq!(outcome, AcquireOutcome::NotAcquired);
        assert!(!dir.path().join("gone.csv.lock").exists());
    }

    #[test]
    fn test_sender_may_lock_a_file_it_has_not_written_yet() {
        let dir = TempDir::new().unwrap();
        let uri = format!("file://{}", dir.path().join("out.csv").display());

        let outcome = manager().acquire(&uri, &options(), None, CallerRole::Sender);
        assert!(outcome.is_acquired());
    }

    #[test]
    fn test_contending_acquire_leaves_foreign_sidecar_untouched() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("a.csv");
        fs::write(&target, b"payload").unwrap();
        let sidecar = dir.path().join("a.csv.lock");
        fs::write(&sidecar, b"7:other-host:10.9.9.9:1000").unwrap();
        let uri = format!("file://{}", target.display());

        let outcome = manager().acquire(&uri, &options(), None, CallerRole::Listener);
        assert_eq!(outcome, AcquireOutcome::NotAcquired);
        assert_eq!(fs::read(&sidecar).unwrap(), b"7:other-host:10.9.9.9:1000");
    }

    #[test]
    fn test_release_removes_sidecar() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("a.csv");
        fs::write(&target, b"payload").unwrap();
        let uri = format!("file://{}", target.display());

        let mgr = manager();
        assert!(mgr.acquire(&uri, &options(), None, CallerRole::Sender).is_acquired());
        mgr.release(&uri, &options());
        assert!(!dir.path().join("a.csv.lock").exists());
    }

    #[test]
    fn test_release_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let uri = format!("file://{}", dir.path().join("a.csv").display());

        let mgr = manager();
        mgr.release(&uri, &options());
        mgr.release(&uri, &options());
    }

    #[test]
    fn test_acquires_serialize_to_a_single_winner() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("a.csv");
        fs::write(&target, b"payload").unwrap();
        let uri = format!("file://{}", target.display());

        let mgr = Arc::new(manager());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let mgr = Arc::clone(&mgr);
            let uri = uri.clone();
            handles.push(std::thread::spawn(move || {
                mgr.acquire(&uri, &BackendOptions::default(), None, CallerRole::Listener)
            }));
        }
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|o| o.is_acquired())
            .count();
        assert_eq!(winners, 1);
    }
}
