//! Clean command implementation
//!
//! Sweeps a local directory for `.lock` sidecars and runs the auto-release
//! policy against each one through a regular acquire attempt: the presence
//! gate finds the existing sidecar, applies the policy, and reports
//! not-acquired. Sidecars that survive the policy are left untouched.

use super::CliError;
use crate::backend::local::LocalBackend;
use crate::lock::{AutoReleasePolicy, CallerRole, LockManager, LOCK_FILE_SUFFIX};
use crate::options::BackendOptions;
use clap::Args;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Arguments for the clean command
#[derive(Args, Debug)]
pub struct CleanArgs {
    /// Directory to sweep for lock sidecars
    pub dir: PathBuf,

    /// Reclaim locks older than this many milliseconds; when omitted,
    /// every lock passing the origin check is reclaimed
    #[arg(long)]
    pub max_age_ms: Option<i64>,

    /// Only reclaim locks written by this host
    #[arg(long)]
    pub same_node_only: bool,
}

impl CleanArgs {
    /// Sweep the directory and report how many sidecars were reclaimed
    pub fn execute(&self) -> Result<(), CliError> {
        let policy = AutoReleasePolicy {
            same_node_only: self.same_node_only,
            max_age_millis: self.max_age_ms,
        };
        let manager = LockManager::new(Arc::new(LocalBackend::new()));

        let mut swept = 0usize;
        let mut reclaimed = 0usize;
        for entry in std::fs::read_dir(&self.dir).map_err(|e| {
            CliError::InvalidArgument(format!("cannot read {}: {e}", self.dir.display()))
        })? {
            let entry = entry.map_err(|e| {
                CliError::InvalidArgument(format!("cannot read directory entry: {e}"))
            })?;
            let path = entry.path();
            let Some(target) = lock_target(&path) else {
                continue;
            };

            swept += 1;
            let target_uri = target.display().to_string();
            info!("sweeping lock sidecar for {target_uri}");
            manager.acquire(
                &target_uri,
                &BackendOptions::default(),
                Some(&policy),
                CallerRole::Listener,
            );
            if !path.exists() {
                reclaimed += 1;
            }
        }

        println!("swept {swept} lock sidecar(s), reclaimed {reclaimed}");
        Ok(())
    }
}

/// The locked file a sidecar path belongs to, if it is one
fn lock_target(path: &Path) -> Option<PathBuf> {
    if !path.is_file() {
        return None;
    }
    let name = path.file_name()?.to_str()?;
    let stem = name.strip_suffix(LOCK_FILE_SUFFIX)?;
    if stem.is_empty() {
        return None;
    }
    Some(path.with_file_name(stem))
}
