use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use rdb_harness::terminate::Clock;

/// A clock that only moves when something sleeps on it.
///
/// Clones share the same time, so a test can keep one handle while the
/// terminator owns another.
#[derive(Debug, Clone)]
pub struct FakeClock {
    origin: Instant,
    offset: Arc<Mutex<Duration>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    /// Total simulated time since construction.
    pub fn elapsed(&self) -> Duration {
        *self.offset.lock().unwrap()
    }

    pub fn advance(&self, by: Duration) {
        *self.offset.lock().unwrap() += by;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}
