//! Status command implementation

use super::CliError;
use crate::backend::local::LocalBackend;
use crate::backend::FileSystemBackend;
use crate::lock::{LockManager, LOCK_FILE_SUFFIX};
use crate::token::LockToken;
use crate::uri;
use chrono::DateTime;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

/// Longest sidecar head worth decoding as a holder token
const TOKEN_READ_LIMIT: usize = 512;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// File URI or local path to inspect
    pub uri: String,

    /// JSON properties file supplying scheme options
    #[arg(long)]
    pub options_file: Option<PathBuf>,
}

impl StatusArgs {
    /// Report lock and fail sidecar state for the URI
    pub fn execute(&self) -> Result<(), CliError> {
        let options = super::load_backend_options(&self.uri, self.options_file.as_deref())?;
        let backend = Arc::new(LocalBackend::new());
        let manager = LockManager::new(backend.clone());

        let canonical = uri::canonical(&self.uri);
        println!("canonical path: {}", uri::mask_password(canonical));

        let lock_uri = format!("{canonical}{LOCK_FILE_SUFFIX}");
        let mut sidecar = backend.resolve(&lock_uri, &options)?;
        if sidecar.exists()? {
            let head = sidecar.read_head(TOKEN_READ_LIMIT)?;
            match decode_holder_token(&head, canonical) {
                Some(token) => {
                    println!("lock: held");
                    println!("  nonce:     {}", token.nonce());
                    println!("  host:      {}", display_or_dash(token.hostname()));
                    println!("  ip:        {}", display_or_dash(token.host_ip()));
                    println!("  acquired:  {}", format_millis(token.timestamp_millis()));
                }
                None => println!("lock: held (unreadable holder token)"),
            }
        } else {
            println!("lock: free");
        }

        if manager.is_fail(&self.uri, &options) {
            println!("fail marker: present");
        } else {
            println!("fail marker: absent");
        }
        Ok(())
    }
}

/// Decode sidecar content as a holder token, logging why it didn't decode
fn decode_holder_token(head: &[u8], canonical: &str) -> Option<LockToken> {
    let raw = match std::str::from_utf8(head) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(
                "lock sidecar for {} is not valid UTF-8: {e}",
                uri::mask_password(canonical)
            );
            return None;
        }
    };
    match LockToken::parse(raw) {
        Ok(token) => Some(token),
        Err(e) => {
            warn!(
                "lock sidecar for {} holds a malformed token: {e}",
                uri::mask_password(canonical)
            );
            None
        }
    }
}

fn display_or_dash(field: &str) -> &str {
    if field.is_empty() {
        "-"
    } else {
        field
    }
}

fn format_millis(millis: Option<i64>) -> String {
    millis
        .and_then(DateTime::from_timestamp_millis)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| "unknown".to_string())
}
