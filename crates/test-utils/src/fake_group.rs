use std::sync::{Arc, Mutex};
use std::time::Duration;

use rdb_harness::errors::{HarnessError, Result};
use rdb_harness::terminate::{
    GroupSignal, GroupSignaller, ProcessGroupId, ProcessLister, ProcessListing, SignalResult,
};

use crate::fake_clock::FakeClock;

/// How a scripted process group reacts to signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behaviour {
    /// Exits as soon as SIGTERM arrives.
    ExitsOnTerm,
    /// Ignores SIGTERM, dies on SIGKILL.
    IgnoresTerm,
    /// Exits this long after SIGTERM (simulated shutdown work).
    ExitsAfter(Duration),
    /// Survives everything; `killpg` keeps succeeding.
    Unkillable,
    /// Never existed.
    Missing,
    /// Owned by someone else: every signal is EPERM.
    Foreign,
    /// Every signal fails with an unexpected errno.
    Broken,
}

/// A process group driven by a [`Behaviour`], observing a [`FakeClock`].
///
/// Also acts as the `ps` lister: it reports one member while alive and none
/// after death, unless a listing override simulates `ps` disagreeing with
/// `killpg`.
#[derive(Debug, Clone)]
pub struct FakeGroup {
    behaviour: Behaviour,
    clock: FakeClock,
    state: Arc<Mutex<GroupState>>,
}

#[derive(Debug, Default)]
struct GroupState {
    alive: bool,
    term_received_at: Option<Duration>,
    sent: Vec<(Duration, GroupSignal)>,
    listed: usize,
    listing_override: Option<Vec<String>>,
}

impl FakeGroup {
    pub fn new(behaviour: Behaviour, clock: FakeClock) -> Self {
        let alive = !matches!(behaviour, Behaviour::Missing);
        Self {
            behaviour,
            clock,
            state: Arc::new(Mutex::new(GroupState {
                alive,
                ..GroupState::default()
            })),
        }
    }

    /// Make the `ps` listing report no members even though `killpg` still
    /// succeeds.
    pub fn with_empty_listing(self) -> Self {
        self.state.lock().unwrap().listing_override = Some(Vec::new());
        self
    }

    /// Make the `ps` listing report these rows.
    pub fn with_listing(self, rows: &[&str]) -> Self {
        self.state.lock().unwrap().listing_override =
            Some(rows.iter().map(|r| r.to_string()).collect());
        self
    }

    pub fn signals(&self) -> Vec<GroupSignal> {
        self.state.lock().unwrap().sent.iter().map(|(_, s)| *s).collect()
    }

    pub fn count(&self, signal: GroupSignal) -> usize {
        self.signals().into_iter().filter(|s| *s == signal).count()
    }

    /// Simulated time at which the first `signal` was sent.
    pub fn first_sent_at(&self, signal: GroupSignal) -> Option<Duration> {
        self.state
            .lock()
            .unwrap()
            .sent
            .iter()
            .find(|(_, s)| *s == signal)
            .map(|(at, _)| *at)
    }

    pub fn times_listed(&self) -> usize {
        self.state.lock().unwrap().listed
    }

    pub fn is_alive(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        self.refresh(&mut state);
        state.alive
    }

    fn refresh(&self, state: &mut GroupState) {
        if let (Behaviour::ExitsAfter(delay), Some(at)) = (self.behaviour, state.term_received_at) {
            if self.clock.elapsed() >= at + delay {
                state.alive = false;
            }
        }
    }
}

impl GroupSignaller for FakeGroup {
    fn signal(&self, group: ProcessGroupId, signal: GroupSignal) -> Result<SignalResult> {
        let mut state = self.state.lock().unwrap();
        let now = self.clock.elapsed();
        state.sent.push((now, signal));

        match self.behaviour {
            Behaviour::Foreign => return Ok(SignalResult::NotPermitted),
            Behaviour::Broken => {
                return Err(HarnessError::Signal {
                    group: group.as_raw(),
                    source: nix::errno::Errno::EINVAL,
                })
            }
            _ => {}
        }

        self.refresh(&mut state);
        if !state.alive {
            return Ok(SignalResult::NoSuchGroup);
        }

        match (signal, self.behaviour) {
            (GroupSignal::Terminate, Behaviour::ExitsOnTerm) => state.alive = false,
            (GroupSignal::Terminate, Behaviour::ExitsAfter(_)) => {
                state.term_received_at.get_or_insert(now);
            }
            (GroupSignal::Kill, Behaviour::IgnoresTerm | Behaviour::ExitsAfter(_)) => {
                state.alive = false
            }
            _ => {}
        }
        Ok(SignalResult::Delivered)
    }
}

impl ProcessLister for FakeGroup {
    fn list(&self, group: ProcessGroupId) -> Result<ProcessListing> {
        let mut state = self.state.lock().unwrap();
        state.listed += 1;
        self.refresh(&mut state);
        let members = match &state.listing_override {
            Some(rows) => rows.clone(),
            None if state.alive => vec![format!("{group} {group} S tester fake-server")],
            None => Vec::new(),
        };
        let mut raw = String::new();
        for row in members.iter() {
            raw.push_str(row);
            raw.push('\n');
        }
        Ok(ProcessListing { members, raw })
    }
}
