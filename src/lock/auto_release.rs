//! Stale-lock reclamation
//!
//! A sidecar left behind by a crashed holder would block its file forever.
//! When an acquire attempt finds an existing sidecar, the caller may ask
//! for suspect locks to be reclaimed by supplying an
//! [`AutoReleasePolicy`]. The policy is deliberately conservative: it
//! never removes a lock younger than the configured threshold, never
//! touches another host's lock when `same_node_only` is set, and never
//! hands the lock to the running call; the caller retries on its next
//! poll tick.

use crate::backend::{close_quietly, FileHandle};
use crate::token::LockToken;
use tracing::{debug, error, warn};

/// Age- and origin-based policy for forced sidecar removal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoReleasePolicy {
    /// Only reclaim locks written by this host
    pub same_node_only: bool,
    /// Minimum holder age in milliseconds before reclamation; `None`
    /// reclaims regardless of age once the other checks pass
    pub max_age_millis: Option<i64>,
}

impl AutoReleasePolicy {
    /// Reclaim locks of any origin once they reach `max_age_millis`
    pub fn any_node(max_age_millis: i64) -> Self {
        Self {
            same_node_only: false,
            max_age_millis: Some(max_age_millis),
        }
    }

    /// Reclaim only this host's locks once they reach `max_age_millis`
    pub fn same_node(max_age_millis: i64) -> Self {
        Self {
            same_node_only: true,
            max_age_millis: Some(max_age_millis),
        }
    }
}

/// Apply the policy to an existing lock sidecar
///
/// `local` is the token freshly encoded by the running acquire attempt;
/// its timestamp is the "now" against which the holder's age is measured.
/// Malformed sidecar content, origin mismatches and read failures all
/// leave the sidecar in place. Delete failures are downgraded to
/// warnings, since the next poll tick tries again.
pub(crate) fn reclaim_stale(
    policy: &AutoReleasePolicy,
    sidecar: &mut dyn FileHandle,
    local: &LockToken,
) {
    let token_len = local.to_string().len();
    let head = match sidecar.read_head(token_len) {
        Ok(bytes) => bytes,
        Err(e) => {
            error!("couldn't inspect the existing lock sidecar: {e}");
            return;
        }
    };

    let holder = match std::str::from_utf8(&head)
        .ok()
        .and_then(|raw| LockToken::parse(raw).ok())
    {
        Some(token) => token,
        None => {
            debug!("existing lock content is not a well-formed holder token; leaving it in place");
            close_quietly(sidecar);
            return;
        }
    };

    if policy.same_node_only && !holder.same_node_as(local) {
        close_quietly(sidecar);
        return;
    }

    let age = local.age_of(&holder);
    if policy.max_age_millis.map_or(true, |max_age| max_age <= age) {
        if let Err(e) = sidecar.delete() {
            warn!("unable to delete the lock file during auto release cycle: {e}");
        }
    }
    close_quietly(sidecar);
}
