//! Lock-holder token encoding
//!
//! A lock sidecar contains a single opaque token identifying its holder:
//! four colon-separated fields, `<nonce>:<hostname>:<ip>:<millis-epoch>`.
//! The token doubles as the holder's claim proof (the verify step of the
//! acquisition handshake compares raw bytes) and as the age oracle for the
//! auto-release policy. Hostname and IP may be empty when local resolution
//! fails; the colon-split arity is always exactly four.

use chrono::Utc;
use once_cell::sync::Lazy;
use std::fmt;
use std::net::ToSocketAddrs;
use tracing::debug;

const FIELD_SEPARATOR: char = ':';

/// Hostname and IP of this process, resolved once and reused by every
/// freshly encoded token
static LOCAL_HOST_IDENTITY: Lazy<(String, String)> = Lazy::new(resolve_local_host);

fn resolve_local_host() -> (String, String) {
    let host = match hostname::get() {
        Ok(name) => name.to_string_lossy().into_owned(),
        Err(e) => {
            debug!("unable to resolve the local hostname: {e}");
            String::new()
        }
    };
    if host.is_empty() {
        return (host, String::new());
    }
    let ip = match (host.as_str(), 0u16).to_socket_addrs() {
        Ok(mut addrs) => addrs
            .next()
            .map(|addr| addr.ip().to_string())
            .unwrap_or_default(),
        Err(e) => {
            debug!("unable to resolve the local IP address: {e}");
            String::new()
        }
    };
    (host, ip)
}

/// Token parsing errors
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// Colon-split arity was not exactly four fields
    #[error("malformed lock token: expected 4 colon-separated fields, found {0}")]
    BadArity(usize),
}

/// A lock-holder token
///
/// Fields are kept in their wire form: foreign tokens are compared and
/// aged without interpreting the nonce, and a timestamp that fails to
/// parse degrades to an age of zero rather than an error (see
/// [`LockToken::age_of`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockToken {
    nonce: String,
    hostname: String,
    host_ip: String,
    timestamp: String,
}

impl LockToken {
    /// Encode a fresh token for this process
    ///
    /// Never fails: hostname/IP resolution errors yield empty fields and a
    /// debug-level diagnostic at first resolution.
    pub fn fresh() -> Self {
        let (hostname, host_ip) = LOCAL_HOST_IDENTITY.clone();
        Self {
            nonce: rand::random::<i64>().to_string(),
            hostname,
            host_ip,
            timestamp: Utc::now().timestamp_millis().to_string(),
        }
    }

    /// Parse a token from its wire form
    ///
    /// Empty hostname/IP fields are tolerated (`::`); any arity other than
    /// four is rejected.
    pub fn parse(raw: &str) -> Result<Self, TokenError> {
        let fields: Vec<&str> = raw.split(FIELD_SEPARATOR).collect();
        if fields.len() != 4 {
            return Err(TokenError::BadArity(fields.len()));
        }
        Ok(Self {
            nonce: fields[0].to_string(),
            hostname: fields[1].to_string(),
            host_ip: fields[2].to_string(),
            timestamp: fields[3].to_string(),
        })
    }

    /// The random nonce field, uninterpreted
    pub fn nonce(&self) -> &str {
        &self.nonce
    }

    /// The hostname field, possibly empty
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// The IP address field, possibly empty
    pub fn host_ip(&self) -> &str {
        &self.host_ip
    }

    /// The wall-clock field in milliseconds since epoch, if parseable
    pub fn timestamp_millis(&self) -> Option<i64> {
        self.timestamp.parse().ok()
    }

    /// Whether `other` was written by the same host as this token
    pub fn same_node_as(&self, other: &Self) -> bool {
        self.hostname == other.hostname && self.host_ip == other.host_ip
    }

    /// Milliseconds elapsed between `holder`'s timestamp and this token's
    ///
    /// An unparseable timestamp on either side yields zero.
    pub fn age_of(&self, holder: &Self) -> i64 {
        match (self.timestamp.parse::<i64>(), holder.timestamp.parse::<i64>()) {
            (Ok(mine), Ok(theirs)) => mine - theirs,
            _ => 0,
        }
    }
}

impl fmt::Display for LockToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.nonce, self.hostname, self.host_ip, self.timestamp
        )
    }
}
