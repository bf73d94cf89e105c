// src/action/stats.rs

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::action::error::{describe, ActionError};

/// Counters accumulated by a continuous action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionStats {
    pub started_at: Instant,
    /// Fixed once, when the loop observes the stop flag.
    pub elapsed: Option<Duration>,
    pub successes: u64,
    pub errors: u64,
    /// Error description => occurrences.
    pub recorded_errors: BTreeMap<String, u64>,
}

impl ActionStats {
    pub fn new(started_at: Instant) -> Self {
        Self {
            started_at,
            elapsed: None,
            successes: 0,
            errors: 0,
            recorded_errors: BTreeMap::new(),
        }
    }

    pub fn record_success(&mut self) {
        self.successes += 1;
    }

    pub fn record_error(&mut self, err: &ActionError) {
        *self.recorded_errors.entry(describe(err)).or_insert(0) += 1;
        self.errors += 1;
    }

    /// Fix `elapsed`; later calls keep the first value.
    pub fn finish(&mut self, now: Instant) {
        if self.elapsed.is_none() {
            self.elapsed = Some(now.saturating_duration_since(self.started_at));
        }
    }

    pub fn total(&self) -> u64 {
        self.successes + self.errors
    }
}
