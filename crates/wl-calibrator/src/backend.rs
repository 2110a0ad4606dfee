//! Testmode backend abstraction
//!
//! Commands never touch netlink directly; they hand encoded testmode
//! requests to a backend. The netlink backend talks to the driver, the
//! scripted backend records requests and replays canned answers.

use std::fmt::Debug;

use crate::error::Result;
use crate::target::Target;

/// Transport for wl12xx / wl18xx testmode requests
pub trait TestmodeBackend: Debug {
    /// Send an encoded testmode attribute stream to `target`
    ///
    /// Returns the reply's `TESTDATA` when the driver sent one.
    ///
    /// # Errors
    ///
    /// Returns error if the request cannot be delivered or is rejected.
    fn testmode(&mut self, target: &Target, testdata: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Get backend type for debugging
    fn backend_type(&self) -> BackendType;
}

/// Backend type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// nl80211 over generic netlink
    Netlink,

    /// Recorded requests, canned replies (tests and dry runs)
    Scripted,
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Netlink => write!(f, "nl80211"),
            Self::Scripted => write!(f, "scripted"),
        }
    }
}

/// Backend selection strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendSelection {
    /// Talk to the driver over nl80211
    Netlink,

    /// Log requests, send nothing, answer like a healthy chip
    DryRun,
}

/// Select a backend
///
/// The netlink backend connects lazily, so file-only commands work on
/// machines without nl80211.
pub fn select_backend(selection: BackendSelection) -> Box<dyn TestmodeBackend> {
    use crate::backends::{NetlinkBackend, ScriptedBackend};

    match selection {
        BackendSelection::Netlink => Box::new(NetlinkBackend::new()),
        BackendSelection::DryRun => {
            tracing::info!("Dry run: testmode requests are logged, not sent");
            Box::new(ScriptedBackend::dry_run())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_maps_to_type() {
        assert_eq!(
            select_backend(BackendSelection::Netlink).backend_type(),
            BackendType::Netlink
        );
        assert_eq!(
            select_backend(BackendSelection::DryRun).backend_type(),
            BackendType::Scripted
        );
    }
}
