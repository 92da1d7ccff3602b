//! # VFS Item Lock
//!
//! Advisory cross-party locking of individual files over URI-addressable
//! file spaces (local filesystem, FTP/FTPS, SFTP, ...). Listener processes
//! polling inbound directories and sender processes depositing outbound
//! payloads coordinate through the file space itself, via a `.lock`
//! sidecar next to the target file, with no broker, no database and no
//! shared memory.
//!
//! ## Features
//!
//! - **Create-then-verify handshake**: tolerates backends without an
//!   atomic exclusive-create primitive, with a documented race window
//! - **Auto-release**: age- and origin-based reclamation of sidecars left
//!   behind by crashed holders
//! - **Fail markers**: advisory `.fail` sidecars poison-flagging files
//!   whose processing failed
//! - **Scheme options**: normalization of SFTP/FTP/FTPS/TLS connection
//!   knobs from URI query strings and configuration sources
//! - **Injected backends**: the file space is reached through a trait the
//!   embedding runtime implements; a local-filesystem backend ships with
//!   the crate
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use vfs_item_lock::{backend::local::LocalBackend, BackendOptions, CallerRole, LockManager};
//!
//! let manager = LockManager::new(Arc::new(LocalBackend::new()));
//! let options = BackendOptions::default();
//! let uri = "file:///data/in/a.csv";
//!
//! if manager
//!     .acquire(uri, &options, None, CallerRole::Listener)
//!     .is_acquired()
//! {
//!     // ... process the file ...
//!     manager.release(uri, &options);
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`uri`] - Canonical-path derivation, password masking and query
//!   parsing
//! - [`token`] - The lock-holder token written into sidecars
//! - [`backend`] - File-space gateway traits and the local backend
//! - [`lock`] - The acquisition protocol and auto-release policy
//! - [`failmark`] - Fail-marker records
//! - [`options`] - Scheme option assembly into [`BackendOptions`]
//!
//! ## Guarantees and non-guarantees
//!
//! Within a process every acquire is serialized, so at most one thread
//! wins a given file. Across processes the protocol is best-effort
//! advisory: on backends without atomic create-if-absent a narrow
//! two-winner window remains (see [`lock`] for the handshake rationale).
//! There is no fairness, no deadlock detection and no cancellation; a
//! caller that abandons an in-flight acquire relies on auto-release to
//! reclaim the sidecar eventually.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// File-space URI handling
pub mod uri;

/// Lock-holder token encoding
pub mod token;

/// Sidecar file gateway traits and backends
pub mod backend;

/// Lock acquisition protocol
pub mod lock;

/// Fail-marker records
pub mod failmark;

/// Scheme option assembly
pub mod options;

/// CLI command implementations
pub mod cli;

// Re-export the types callers touch on every acquire/release cycle
pub use backend::{BackendError, FileHandle, FileSystemBackend};
pub use lock::{AcquireOutcome, AutoReleasePolicy, CallerRole, LockManager};
pub use options::BackendOptions;
pub use token::LockToken;
