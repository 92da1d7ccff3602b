//! CLI command implementations

pub mod clean;
pub mod error;
pub mod release;
pub mod status;

pub use clean::CleanArgs;
pub use error::CliError;
pub use release::ReleaseArgs;
pub use status::StatusArgs;

use crate::options::{self, BackendOptions, ParameterBag};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::Path;

/// Inspect and maintain file-item lock sidecars
#[derive(Parser, Debug)]
#[command(name = "vfs-item-lock", version, about)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Report sidecar state for a file URI
    Status(StatusArgs),
    /// Remove the lock sidecar for a file URI
    Release(ReleaseArgs),
    /// Sweep a directory, reclaiming stale lock sidecars
    Clean(CleanArgs),
}

/// Assemble backend options for a URI, overlaying a JSON properties file
/// when one was supplied
///
/// URIs without a scheme (bare local paths) get default options.
pub(crate) fn load_backend_options(
    uri: &str,
    options_file: Option<&Path>,
) -> Result<BackendOptions, CliError> {
    let bag = match options_file {
        Some(path) => {
            let raw = fs::read_to_string(path).map_err(|e| {
                CliError::InvalidArgument(format!(
                    "cannot read options file {}: {e}",
                    path.display()
                ))
            })?;
            serde_json::from_str::<ParameterBag>(&raw)?
        }
        None => ParameterBag::new(),
    };
    Ok(options::assemble(uri, &bag).unwrap_or_default())
}
