// src/terminate/mod.rs

//! Process-group termination.
//!
//! Guarantees that a process group is no longer running under our control:
//! polite `SIGTERM`, a grace window, `SIGKILL` until the kill deadline, and a
//! final `ps` listing as arbiter.
//!
//! - [`policy`] holds the validated inputs (`ProcessGroupId`,
//!   `TerminationPolicy`).
//! - [`clock`] abstracts time so tests do not sleep for real.
//! - [`signal`] abstracts `killpg` and the external process listing.
//! - [`group`] is the phase machine itself.

pub mod clock;
pub mod group;
pub mod policy;
pub mod signal;

pub use clock::{Clock, SystemClock};
pub use group::{GroupTerminator, Phase, TerminationOutcome, POLL_INTERVAL};
pub use policy::{ProcessGroupId, TerminationPolicy};
pub use signal::{
    parse_ps_listing, GroupSignal, GroupSignaller, NixSignaller, ProcessLister, ProcessListing,
    PsLister, SignalResult,
};

use crate::errors::Result;

/// Terminate `group` with the real clock, `killpg` and `ps`.
pub fn kill_process_group(group: ProcessGroupId, policy: TerminationPolicy) -> Result<TerminationOutcome> {
    GroupTerminator::new(SystemClock, NixSignaller, PsLister).terminate(group, policy)
}
