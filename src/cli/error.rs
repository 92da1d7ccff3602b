//! CLI error types and conversions

use crate::backend::BackendError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Backend error
    #[error("backend error: {0}")]
    BackendError(#[from] BackendError),

    /// Options file parse error
    #[error("options file error: {0}")]
    OptionsFileError(#[from] serde_json::Error),

    /// Invalid argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
