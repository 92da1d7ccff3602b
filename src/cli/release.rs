//! Release command implementation

use super::CliError;
use crate::backend::local::LocalBackend;
use crate::lock::LockManager;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;

/// Arguments for the release command
#[derive(Args, Debug)]
pub struct ReleaseArgs {
    /// File URI or local path whose lock sidecar should be removed
    pub uri: String,

    /// Also remove the fail marker, if present
    #[arg(long)]
    pub fail: bool,

    /// JSON properties file supplying scheme options
    #[arg(long)]
    pub options_file: Option<PathBuf>,
}

impl ReleaseArgs {
    /// Remove the lock sidecar (and optionally the fail marker)
    pub fn execute(&self) -> Result<(), CliError> {
        let options = super::load_backend_options(&self.uri, self.options_file.as_deref())?;
        let manager = LockManager::new(Arc::new(LocalBackend::new()));

        manager.release(&self.uri, &options);
        println!("released lock sidecar (if any)");

        if self.fail {
            manager.release_fail(&self.uri, &options);
            println!("released fail marker (if any)");
        }
        Ok(())
    }
}
