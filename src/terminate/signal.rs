// src/terminate/signal.rs

//! Signalling seam: `killpg` for delivery, `ps` for the final verdict.

use std::process::Command;

use nix::errno::Errno;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use tracing::debug;

use crate::errors::{HarnessError, Result};
use crate::terminate::ProcessGroupId;

/// What to send to a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupSignal {
    /// Signal 0: liveness check only.
    Probe,
    /// `SIGTERM`.
    Terminate,
    /// `SIGKILL`.
    Kill,
}

/// Result of signalling a group.
///
/// Both `NoSuchGroup` and `NotPermitted` mean the group is not running under
/// our control, which is all the terminator promises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalResult {
    Delivered,
    NoSuchGroup,
    NotPermitted,
}

impl SignalResult {
    pub fn is_gone(self) -> bool {
        !matches!(self, SignalResult::Delivered)
    }
}

pub trait GroupSignaller {
    fn signal(&self, group: ProcessGroupId, signal: GroupSignal) -> Result<SignalResult>;
}

/// Members of a group as reported by an external listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessListing {
    /// One line per live (non-zombie) member.
    pub members: Vec<String>,
    /// Header plus every row of the group (zombies too), for diagnostics.
    pub raw: String,
}

pub trait ProcessLister {
    fn list(&self, group: ProcessGroupId) -> Result<ProcessListing>;
}

impl<S: GroupSignaller + ?Sized> GroupSignaller for &S {
    fn signal(&self, group: ProcessGroupId, signal: GroupSignal) -> Result<SignalResult> {
        (**self).signal(group, signal)
    }
}

impl<L: ProcessLister + ?Sized> ProcessLister for &L {
    fn list(&self, group: ProcessGroupId) -> Result<ProcessListing> {
        (**self).list(group)
    }
}

/// `killpg(2)` through `nix`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NixSignaller;

impl GroupSignaller for NixSignaller {
    fn signal(&self, group: ProcessGroupId, signal: GroupSignal) -> Result<SignalResult> {
        let sig = match signal {
            GroupSignal::Probe => None,
            GroupSignal::Terminate => Some(Signal::SIGTERM),
            GroupSignal::Kill => Some(Signal::SIGKILL),
        };
        match killpg(Pid::from_raw(group.as_raw()), sig) {
            Ok(()) => Ok(SignalResult::Delivered),
            Err(Errno::ESRCH) => Ok(SignalResult::NoSuchGroup),
            Err(Errno::EPERM) => Ok(SignalResult::NotPermitted),
            Err(source) => Err(HarnessError::Signal {
                group: group.as_raw(),
                source,
            }),
        }
    }
}

/// Lists group members with `ps`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PsLister;

impl ProcessLister for PsLister {
    fn list(&self, group: ProcessGroupId) -> Result<ProcessListing> {
        let output = Command::new("ps")
            .args(["-e", "-ww", "-o", PS_COLUMNS])
            .output()?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut listing = parse_ps_listing(&stdout, group);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            listing.raw.push_str(stderr.trim_end());
            listing.raw.push('\n');
        }
        debug!(%group, members = listing.members.len(), "ps listing");
        Ok(listing)
    }
}

/// Headerless columns requested from `ps`.
pub const PS_COLUMNS: &str = "pgid=,pid=,stat=,user=,command=";

const PS_HEADER: &str = "PGID PID STAT USER COMMAND";

/// Keep the rows of `pgid pid stat user command` output that belong to
/// `group`.
///
/// `members` excludes zombies; `raw` is a header plus every row of the
/// group, zombies included.
pub fn parse_ps_listing(raw: &str, group: ProcessGroupId) -> ProcessListing {
    let wanted = group.as_raw().to_string();
    let mut members = Vec::new();
    let mut rows = String::from(PS_HEADER);
    rows.push('\n');

    for line in raw.lines() {
        let mut cols = line.split_whitespace();
        let (Some(pgid), Some(_pid), Some(stat)) = (cols.next(), cols.next(), cols.next()) else {
            continue;
        };
        if pgid != wanted {
            continue;
        }
        let row = line.trim();
        rows.push_str(row);
        rows.push('\n');
        if !stat.starts_with('Z') {
            members.push(row.to_string());
        }
    }

    ProcessListing { members, raw: rows }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ps_rows_are_filtered_by_group_and_zombies_ignored() {
        let raw = "\
  4242  4242 Ss   alice  /usr/bin/rethinkdb --port-offset 1
  4242  4250 Z    alice  [rethinkdb] <defunct>
  4243  4251 S    alice  sleep 100
";
        let group = ProcessGroupId::new(4242).unwrap();
        let listing = parse_ps_listing(raw, group);
        assert_eq!(listing.members.len(), 1);
        assert!(listing.members[0].contains("--port-offset 1"));
        assert_eq!(
            listing.raw,
            "PGID PID STAT USER COMMAND\n\
             4242  4242 Ss   alice  /usr/bin/rethinkdb --port-offset 1\n\
             4242  4250 Z    alice  [rethinkdb] <defunct>\n"
        );
        assert!(!listing.raw.contains("sleep 100"));
    }

    #[test]
    fn probing_a_missing_group_reports_gone() {
        // pid_max on Linux is at most 2^22, so this group cannot exist.
        let group = ProcessGroupId::new(i32::MAX as i64).unwrap();
        let result = NixSignaller.signal(group, GroupSignal::Probe).unwrap();
        assert!(result.is_gone());
    }
}
