//! Sidecar file gateway
//!
//! The lock core reaches a file space through the [`FileSystemBackend`]
//! trait, an injected dependency owned by the enclosing runtime. A backend
//! resolves URIs into [`FileHandle`]s; the handle carries every operation
//! the protocol needs on an individual file. Remote backends typically
//! pool connections per filesystem, which is why the handle exposes
//! [`FileHandle::close_filesystem`] separately from [`FileHandle::close`]:
//! acquire-error paths must release the pooled connection or chronic
//! backend failures accumulate handles without bound.
//!
//! All failures surface as a single [`BackendError`] kind; backend-specific
//! error types never cross this boundary.

use crate::options::BackendOptions;
use tracing::warn;

pub mod local;

/// Backend errors (resolution and per-file I/O)
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// Underlying I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// URI scheme not served by this backend
    #[error("unsupported scheme in {0}")]
    UnsupportedScheme(String),

    /// Any backend failure that is not plain I/O
    #[error("{0}")]
    Other(String),
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// A file-space backend, injected by the enclosing runtime
///
/// Implementations must be shareable across threads; the lock core holds
/// one behind an `Arc` and resolves handles per call.
pub trait FileSystemBackend: Send + Sync {
    /// Resolve a URI into a file handle
    ///
    /// The URI is expected to be canonical (no query string); per-request
    /// parameters travel in `options` instead.
    fn resolve(&self, uri: &str, options: &BackendOptions) -> BackendResult<Box<dyn FileHandle>>;
}

/// A handle on an individual file within a backend
///
/// Callers are responsible for pairing [`create`](FileHandle::create) and
/// [`write_all`](FileHandle::write_all) with [`close`](FileHandle::close)
/// on every exit path.
pub trait FileHandle: Send {
    /// The URI this handle was resolved from
    fn uri(&self) -> &str;

    /// Whether the file currently exists
    fn exists(&mut self) -> BackendResult<bool>;

    /// Create the file
    ///
    /// Only meaningful after observing `exists() == false`; behavior on an
    /// existing file is backend-defined.
    fn create(&mut self) -> BackendResult<()>;

    /// Replace the file content with `bytes`, flushing before return
    fn write_all(&mut self, bytes: &[u8]) -> BackendResult<()>;

    /// Read up to `max` bytes from the start of the file
    ///
    /// A result shorter than `max` means end-of-file was reached.
    fn read_head(&mut self, max: usize) -> BackendResult<Vec<u8>>;

    /// Delete the file
    fn delete(&mut self) -> BackendResult<()>;

    /// Release the handle; safe to call more than once
    fn close(&mut self) -> BackendResult<()>;

    /// Release the backend connection serving this handle's parent
    ///
    /// Invoked on acquire-error paths to reclaim pooled connections.
    /// Backends without pooled connections treat this as a no-op.
    fn close_filesystem(&mut self) -> BackendResult<()>;
}

/// Close a handle, downgrading failure to a warning
pub(crate) fn close_quietly(handle: &mut dyn FileHandle) {
    if let Err(e) = handle.close() {
        warn!("unable to close the sidecar handle for {}: {e}", handle.uri());
    }
}
