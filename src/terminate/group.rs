// src/terminate/group.rs

//! Termination phase machine.
//!
//! ```text
//! Signaling(SIGTERM) -> GracePoll -> ForceSignaling(SIGKILL) <-> ForcePoll -> Verify -> Done | Failed
//! ```
//!
//! `grace_timeout == 0` starts directly in `ForceSignaling`. A group that is
//! gone (or not ours to signal) ends the machine in `Done` from any phase.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::errors::{HarnessError, Result};
use crate::terminate::clock::Clock;
use crate::terminate::policy::{ProcessGroupId, TerminationPolicy};
use crate::terminate::signal::{GroupSignal, GroupSignaller, ProcessLister, SignalResult};

/// Sleep between liveness checks.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Signaling,
    GracePoll,
    ForceSignaling,
    ForcePoll,
    Verify,
    Done,
    Failed,
}

/// How a successful termination ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminationOutcome {
    pub group: ProcessGroupId,
    /// Phase in which the group was confirmed gone.
    pub confirmed_in: Phase,
    /// Last signal answer; `NotPermitted` means the group was never ours.
    pub last_result: SignalResult,
    pub elapsed: Duration,
}

pub struct GroupTerminator<C, S, L> {
    clock: C,
    signaller: S,
    lister: L,
    poll_interval: Duration,
}

impl<C, S, L> GroupTerminator<C, S, L>
where
    C: Clock,
    S: GroupSignaller,
    L: ProcessLister,
{
    pub fn new(clock: C, signaller: S, lister: L) -> Self {
        Self {
            clock,
            signaller,
            lister,
            poll_interval: POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Make sure `group` is not running.
    ///
    /// Both deadlines are counted from the call. SIGKILL is sent at least
    /// once after the grace window, then until the kill deadline, so this
    /// blocks for about `max(grace_timeout, kill_timeout)` plus one poll
    /// interval and the final listing.
    pub fn terminate(
        &self,
        group: ProcessGroupId,
        policy: TerminationPolicy,
    ) -> Result<TerminationOutcome> {
        let started = self.clock.now();
        let grace_deadline = started + policy.grace_timeout;
        let kill_deadline = started + policy.kill_timeout;

        info!(
            %group,
            grace = ?policy.grace_timeout,
            kill = ?policy.kill_timeout,
            "terminating process group"
        );

        let mut phase = if policy.grace_timeout.is_zero() {
            Phase::ForceSignaling
        } else {
            Phase::Signaling
        };

        loop {
            debug!(%group, ?phase, "termination phase");

            phase = match phase {
                Phase::Signaling => {
                    let result = self.send(group, GroupSignal::Terminate)?;
                    if result.is_gone() {
                        return Ok(self.done(group, phase, result, started));
                    }
                    Phase::GracePoll
                }

                Phase::GracePoll => {
                    let now = self.clock.now();
                    if now >= grace_deadline {
                        debug!(%group, "grace period expired");
                        Phase::ForceSignaling
                    } else {
                        let result = self.send(group, GroupSignal::Probe)?;
                        if result.is_gone() {
                            return Ok(self.done(group, phase, result, started));
                        }
                        self.clock
                            .sleep(self.poll_interval.min(grace_deadline - now));
                        Phase::GracePoll
                    }
                }

                Phase::ForceSignaling => {
                    let probe = self.send(group, GroupSignal::Probe)?;
                    if probe.is_gone() {
                        return Ok(self.done(group, phase, probe, started));
                    }
                    let result = self.send(group, GroupSignal::Kill)?;
                    if result.is_gone() {
                        return Ok(self.done(group, phase, result, started));
                    }
                    Phase::ForcePoll
                }

                Phase::ForcePoll => {
                    self.clock.sleep(self.poll_interval);
                    if self.clock.now() < kill_deadline {
                        Phase::ForceSignaling
                    } else {
                        Phase::Verify
                    }
                }

                Phase::Verify => {
                    let listing = self.lister.list(group)?;
                    if listing.members.is_empty() {
                        info!(%group, "ps reports no live members after kill deadline");
                        return Ok(self.done(group, phase, SignalResult::NoSuchGroup, started));
                    }
                    let elapsed = self.clock.now().saturating_duration_since(started);
                    warn!(
                        %group,
                        ?elapsed,
                        members = listing.members.len(),
                        phase = ?Phase::Failed,
                        "process group survived the kill deadline"
                    );
                    return Err(HarnessError::TerminationTimeout {
                        group: group.as_raw(),
                        elapsed,
                        listing: listing.raw,
                    });
                }

                Phase::Done | Phase::Failed => unreachable!("terminal phases return"),
            };
        }
    }

    fn send(&self, group: ProcessGroupId, signal: GroupSignal) -> Result<SignalResult> {
        let result = self.signaller.signal(group, signal)?;
        if result == SignalResult::NotPermitted {
            warn!(%group, ?signal, "not permitted to signal process group; not ours");
        }
        Ok(result)
    }

    fn done(
        &self,
        group: ProcessGroupId,
        confirmed_in: Phase,
        last_result: SignalResult,
        started: Instant,
    ) -> TerminationOutcome {
        let elapsed = self.clock.now().saturating_duration_since(started);
        info!(%group, ?confirmed_in, ?elapsed, phase = ?Phase::Done, "process group is gone");
        TerminationOutcome {
            group,
            confirmed_in,
            last_result,
            elapsed,
        }
    }
}
