//! Local-filesystem backend
//!
//! Serves `file://` URIs and bare paths directly against the local
//! filesystem. There are no pooled connections, so
//! [`FileHandle::close`] and [`FileHandle::close_filesystem`] are
//! bookkeeping no-ops; every operation opens the file afresh.
//!
//! Remote backends (FTP/FTPS/SFTP) are supplied by the embedding runtime
//! as further [`FileSystemBackend`] implementations.

use super::{BackendError, BackendResult, FileHandle, FileSystemBackend};
use crate::options::BackendOptions;
use crate::uri;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::PathBuf;

/// Backend over the local filesystem
#[derive(Debug, Default)]
pub struct LocalBackend;

impl LocalBackend {
    /// Create a local backend
    pub fn new() -> Self {
        Self
    }
}

impl FileSystemBackend for LocalBackend {
    fn resolve(&self, uri: &str, _options: &BackendOptions) -> BackendResult<Box<dyn FileHandle>> {
        let path = local_path(uri)?;
        Ok(Box::new(LocalHandle {
            uri: uri.to_string(),
            path,
        }))
    }
}

fn local_path(uri: &str) -> BackendResult<PathBuf> {
    match uri::extract_scheme(uri) {
        Some("file") => Ok(PathBuf::from(&uri["file://".len()..])),
        Some(_) => Err(BackendError::UnsupportedScheme(uri::mask_password(uri))),
        None => Ok(PathBuf::from(uri)),
    }
}

struct LocalHandle {
    uri: String,
    path: PathBuf,
}

impl FileHandle for LocalHandle {
    fn uri(&self) -> &str {
        &self.uri
    }

    fn exists(&mut self) -> BackendResult<bool> {
        match fs::metadata(&self.path) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn create(&mut self) -> BackendResult<()> {
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)?;
        Ok(())
    }

    fn write_all(&mut self, bytes: &[u8]) -> BackendResult<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)?;
        file.write_all(bytes)?;
        file.flush()?;
        Ok(())
    }

    fn read_head(&mut self, max: usize) -> BackendResult<Vec<u8>> {
        let file = fs::File::open(&self.path)?;
        let mut head = Vec::with_capacity(max);
        file.take(max as u64).read_to_end(&mut head)?;
        Ok(head)
    }

    fn delete(&mut self) -> BackendResult<()> {
        fs::remove_file(&self.path)?;
        Ok(())
    }

    fn close(&mut self) -> BackendResult<()> {
        Ok(())
    }

    fn close_filesystem(&mut self) -> BackendResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn resolve(backend: &LocalBackend, uri: &str) -> Box<dyn FileHandle> {
        backend
            .resolve(uri, &BackendOptions::default())
            .expect("local resolve")
    }

    #[test]
    fn test_resolve_file_scheme_and_bare_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.csv");
        std::fs::write(&path, b"x").unwrap();

        let backend = LocalBackend::new();
        let mut by_uri = resolve(&backend, &format!("file://{}", path.display()));
        let mut by_path = resolve(&backend, &path.display().to_string());
        assert!(by_uri.exists().unwrap());
        assert!(by_path.exists().unwrap());
    }

    #[test]
    fn test_resolve_rejects_foreign_scheme() {
        let backend = LocalBackend::new();
        let result = backend.resolve("sftp://host/dir/a.csv", &BackendOptions::default());
        assert!(matches!(result, Err(BackendError::UnsupportedScheme(_))));
    }

    #[test]
    fn test_create_write_read_delete_cycle() {
        let dir = TempDir::new().unwrap();
        let uri = dir.path().join("x.lock").display().to_string();

        let backend = LocalBackend::new();
        let mut handle = resolve(&backend, &uri);
        assert!(!handle.exists().unwrap());

        handle.create().unwrap();
        assert!(handle.exists().unwrap());

        handle.write_all(b"content").unwrap();
        assert_eq!(handle.read_head(7).unwrap(), b"content");
        // reading past the end reports the short head
        assert_eq!(handle.read_head(64).unwrap(), b"content");
        // a shorter head truncates
        assert_eq!(handle.read_head(3).unwrap(), b"con");

        handle.delete().unwrap();
        assert!(!handle.exists().unwrap());
    }

    #[test]
    fn test_read_head_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let uri = dir.path().join("missing").display().to_string();

        let backend = LocalBackend::new();
        let mut handle = resolve(&backend, &uri);
        assert!(handle.read_head(8).is_err());
    }

    #[test]
    fn test_close_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let uri = dir.path().join("y").display().to_string();

        let backend = LocalBackend::new();
        let mut handle = resolve(&backend, &uri);
        handle.close().unwrap();
        handle.close().unwrap();
        handle.close_filesystem().unwrap();
    }
}
