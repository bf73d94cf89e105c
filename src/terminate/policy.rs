// src/terminate/policy.rs

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::config::TerminationSection;
use crate::errors::{HarnessError, Result};

/// OS process group id. Always non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessGroupId(i32);

impl ProcessGroupId {
    pub fn new(raw: i64) -> Result<Self> {
        i32::try_from(raw)
            .ok()
            .filter(|id| *id >= 0)
            .map(ProcessGroupId)
            .ok_or_else(|| {
                HarnessError::usage(format!(
                    "a process group id must be a non-negative integer, got: {raw}"
                ))
            })
    }

    pub fn as_raw(self) -> i32 {
        self.0
    }
}

impl FromStr for ProcessGroupId {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self> {
        let raw: i64 = s.trim().parse().map_err(|_| {
            HarnessError::usage(format!(
                "a process group id must be a non-negative integer, got: {s:?}"
            ))
        })?;
        Self::new(raw)
    }
}

impl fmt::Display for ProcessGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Deadlines for one termination call.
///
/// `grace_timeout` bounds the polite phase; `kill_timeout` bounds the forceful
/// phase and starts counting when that phase begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminationPolicy {
    pub grace_timeout: Duration,
    pub kill_timeout: Duration,
}

impl TerminationPolicy {
    pub fn new(grace_timeout: Duration, kill_timeout: Duration) -> Self {
        Self {
            grace_timeout,
            kill_timeout,
        }
    }

    /// Build from (possibly fractional) seconds; negative, NaN or infinite
    /// values are usage errors.
    pub fn from_secs_f64(grace_secs: f64, kill_secs: f64) -> Result<Self> {
        Ok(Self::new(
            seconds("grace timeout", grace_secs)?,
            seconds("kill timeout", kill_secs)?,
        ))
    }

    /// Parse textual seconds, as passed on a command line.
    pub fn parse(grace: &str, kill: &str) -> Result<Self> {
        let parse = |what: &str, s: &str| {
            s.trim().parse::<f64>().map_err(|_| {
                HarnessError::usage(format!("a valid {what} in seconds is required, got: {s:?}"))
            })
        };
        Self::from_secs_f64(parse("grace timeout", grace)?, parse("kill timeout", kill)?)
    }
}

fn seconds(what: &str, secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs)
        .map_err(|_| HarnessError::usage(format!("a valid {what} is required, got: {secs}")))
}

impl Default for TerminationPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(5), Duration::from_secs(20))
    }
}

impl From<TerminationSection> for TerminationPolicy {
    fn from(section: TerminationSection) -> Self {
        Self::new(section.grace_timeout, section.kill_timeout)
    }
}
