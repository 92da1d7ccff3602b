//! Fail-marker records
//!
//! A `.fail` sidecar next to a file signals that a previous processing
//! attempt failed. The signal is purely advisory: existence alone carries
//! the meaning, and nothing stops a caller that chooses to ignore it. The
//! content is the marking time in decimal milliseconds since epoch,
//! advisory metadata for operators.
//!
//! Marking shares the [`LockManager`]'s process-wide critical section with
//! lock acquisition; queries and clears do not need it.

use crate::backend::{close_quietly, BackendError};
use crate::lock::LockManager;
use crate::options::BackendOptions;
use crate::uri;
use chrono::Utc;
use tracing::error;

/// Suffix appended to the canonical path to derive the fail sidecar
pub const FAIL_FILE_SUFFIX: &str = ".fail";

impl LockManager {
    /// Record a processing failure for `target_uri`
    ///
    /// Creates the fail sidecar if missing and overwrites its timestamp
    /// otherwise. There is no return value: the marker is itself an
    /// error-channel signal, so failures are logged with the masked URI
    /// and swallowed.
    pub fn mark_fail(&self, target_uri: &str, options: &BackendOptions) {
        let _serialized = self.enter_critical_section();
        let stamp = Utc::now().timestamp_millis().to_string();
        if let Err(e) = self.write_fail_marker(target_uri, options, stamp.as_bytes()) {
            error!(
                "cannot mark the fail record for {}: {e}",
                uri::mask_password(target_uri)
            );
        }
    }

    /// Whether a fail marker exists for `target_uri`
    ///
    /// Backend errors are logged and reported as "no marker".
    pub fn is_fail(&self, target_uri: &str, options: &BackendOptions) -> bool {
        let canonical = uri::canonical(target_uri);
        let fail_uri = format!("{canonical}{FAIL_FILE_SUFFIX}");
        match self.fail_marker_exists(&fail_uri, options) {
            Ok(present) => present,
            Err(e) => {
                error!(
                    "couldn't check the fail record for {}: {e}",
                    uri::mask_password(target_uri)
                );
                false
            }
        }
    }

    /// Remove the fail marker for `target_uri`, if present
    ///
    /// Idempotent; backend errors are logged and swallowed.
    pub fn release_fail(&self, target_uri: &str, options: &BackendOptions) {
        let canonical = uri::canonical(target_uri);
        let fail_uri = format!("{canonical}{FAIL_FILE_SUFFIX}");
        if let Err(e) = self.delete_if_present(&fail_uri, options) {
            error!(
                "couldn't release the fail record for {}: {e}",
                uri::mask_password(target_uri)
            );
        }
    }

    fn write_fail_marker(
        &self,
        target_uri: &str,
        options: &BackendOptions,
        stamp: &[u8],
    ) -> Result<(), BackendError> {
        let canonical = uri::canonical(target_uri);
        let fail_uri = format!("{canonical}{FAIL_FILE_SUFFIX}");
        let mut marker = self.backend.resolve(&fail_uri, options)?;
        if !marker.exists()? {
            marker.create()?;
        }
        if let Err(e) = marker.write_all(stamp) {
            error!(
                "couldn't create the fail file for {}: {e}",
                uri::mask_password(canonical)
            );
            // don't leave a half-written marker behind
            if let Err(delete_err) = marker.delete() {
                error!("unable to remove the partially written fail record: {delete_err}");
            }
        }
        close_quietly(marker.as_mut());
        Ok(())
    }

    fn fail_marker_exists(
        &self,
        fail_uri: &str,
        options: &BackendOptions,
    ) -> Result<bool, BackendError> {
        let mut marker = self.backend.resolve(fail_uri, options)?;
        let present = marker.exists()?;
        close_quietly(marker.as_mut());
        Ok(present)
    }
}
