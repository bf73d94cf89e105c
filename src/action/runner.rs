// src/action/runner.rs

use std::any::Any;
use std::collections::BTreeMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use futures_util::FutureExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::action::error::{ActionError, ActionErrorKind};
use crate::action::stats::ActionStats;
use crate::config::RunnerSection;

pub type ActionFuture<'a> = Pin<Box<dyn Future<Output = Result<(), ActionError>> + Send + 'a>>;

/// What a single tick of a continuous action gets to work with.
pub struct ActionContext<C> {
    /// Connection shared with the controlling test; the action does its own
    /// synchronisation if it needs any.
    pub connection: Arc<C>,
    /// Keyspace (database) the runner was pointed at, if any.
    pub keyspace: Option<Arc<str>>,
    /// The runner's own stop flag; setting it ends the loop after this tick.
    pub stop: StopSignal,
}

impl<C> Clone for ActionContext<C> {
    fn clone(&self) -> Self {
        Self {
            connection: Arc::clone(&self.connection),
            keyspace: self.keyspace.clone(),
            stop: self.stop.clone(),
        }
    }
}

/// A unit of work repeated by a [`ContinuousActionRunner`].
///
/// Closures `FnMut(ActionContext<C>) -> impl Future<Output = Result<(),
/// ActionError>>` implement this directly; implement it by hand for actions
/// that keep state between ticks.
pub trait ContinuousAction<C>: Send + 'static {
    fn perform(&mut self, ctx: ActionContext<C>) -> ActionFuture<'_>;
}

impl<C, F, Fut> ContinuousAction<C> for F
where
    F: FnMut(ActionContext<C>) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), ActionError>> + Send + 'static,
{
    fn perform(&mut self, ctx: ActionContext<C>) -> ActionFuture<'_> {
        Box::pin(self(ctx))
    }
}

/// Cooperative stop flag, checked at the top of every tick.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Result of [`ContinuousActionRunner::stop`].
#[must_use = "a degraded stop means the counters may still change"]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopStatus {
    Stopped,
    /// The action did not return within the timeout; the task is still
    /// running and its results might not be trustable.
    Degraded,
}

#[derive(Debug, Clone)]
pub struct RunnerOptions {
    pub keyspace: Option<String>,
    /// Pause after every tick.
    pub delay: Duration,
    pub auto_start: bool,
    /// Join timeout used by [`ContinuousActionRunner::error_summary`].
    pub stop_timeout: Duration,
}

impl RunnerOptions {
    pub fn keyspace(mut self, keyspace: impl Into<String>) -> Self {
        self.keyspace = Some(keyspace.into());
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn manual_start(mut self) -> Self {
        self.auto_start = false;
        self
    }

    pub fn stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            keyspace: None,
            delay: Duration::from_millis(10),
            auto_start: true,
            stop_timeout: Duration::from_millis(500),
        }
    }
}

impl From<RunnerSection> for RunnerOptions {
    fn from(section: RunnerSection) -> Self {
        Self {
            delay: section.delay,
            stop_timeout: section.stop_timeout,
            ..Self::default()
        }
    }
}

/// Error tallies returned by [`ContinuousActionRunner::error_summary`],
/// together with how the stop that preceded them went.
#[must_use = "a degraded summary may still be changing"]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorSummary {
    /// Error description => count.
    pub errors: BTreeMap<String, u64>,
    pub status: StopStatus,
}

impl ErrorSummary {
    /// True when the action was still running when the summary was taken.
    pub fn is_degraded(&self) -> bool {
        self.status == StopStatus::Degraded
    }
}

/// Runs a [`ContinuousAction`] on its own tokio task until stopped.
///
/// Failures never propagate: each one, panics included, is described and
/// tallied in [`ActionStats`] and the loop carries on with the next tick.
///
/// Dropping the runner raises the stop flag but does not wait for the task.
pub struct ContinuousActionRunner<C> {
    connection: Arc<C>,
    options: RunnerOptions,
    action: Option<Box<dyn ContinuousAction<C>>>,
    stop: StopSignal,
    stats: Arc<Mutex<ActionStats>>,
    handle: Option<JoinHandle<()>>,
}

impl<C> ContinuousActionRunner<C>
where
    C: Send + Sync + 'static,
{
    /// Create a runner; with `auto_start` (the default) the loop starts
    /// immediately, which requires a tokio runtime.
    pub fn new(
        connection: Arc<C>,
        action: impl ContinuousAction<C>,
        options: RunnerOptions,
    ) -> Self {
        let auto_start = options.auto_start;
        let mut runner = Self {
            connection,
            options,
            action: Some(Box::new(action)),
            stop: StopSignal::default(),
            stats: Arc::new(Mutex::new(ActionStats::new(Instant::now()))),
            handle: None,
        };
        if auto_start {
            runner.start();
        }
        runner
    }

    /// Spawn the loop. Starting twice is a no-op.
    pub fn start(&mut self) {
        let Some(action) = self.action.take() else {
            debug!("continuous action already started");
            return;
        };

        let ctx = ActionContext {
            connection: Arc::clone(&self.connection),
            keyspace: self.options.keyspace.as_deref().map(Arc::from),
            stop: self.stop.clone(),
        };
        info!(
            keyspace = ?self.options.keyspace,
            delay = ?self.options.delay,
            "starting continuous action"
        );

        self.handle = Some(tokio::spawn(run_loop(
            action,
            ctx,
            self.options.delay,
            Arc::clone(&self.stats),
        )));
    }

    /// Handle that stops the loop at its next tick. Useful from inside an
    /// action or from another task.
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Ask the loop to stop and wait up to `timeout` for it.
    ///
    /// An in-flight action is never interrupted. If it is still running
    /// after `timeout` this returns [`StopStatus::Degraded`] and the task is
    /// left to finish on its own.
    pub async fn stop(&mut self, timeout: Duration) -> StopStatus {
        self.stop.set();

        let Some(handle) = self.handle.as_mut() else {
            return StopStatus::Stopped;
        };

        match tokio::time::timeout(timeout, handle).await {
            Ok(joined) => {
                if let Err(e) = joined {
                    warn!(error = %e, "continuous action task ended abnormally");
                }
                self.handle = None;
                StopStatus::Stopped
            }
            Err(_) => {
                warn!(
                    ?timeout,
                    "continuous action failed to stop when asked to, results might not be trustable"
                );
                StopStatus::Degraded
            }
        }
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> ActionStats {
        lock(&self.stats).clone()
    }

    /// Stop (if still running) and return the error tallies.
    ///
    /// If the action does not return within the configured stop timeout the
    /// summary is marked [`StopStatus::Degraded`]: the counts are a snapshot
    /// of a loop that is still running.
    pub async fn error_summary(&mut self) -> ErrorSummary {
        let status = if self.is_running() {
            self.stop(self.options.stop_timeout).await
        } else {
            StopStatus::Stopped
        };
        ErrorSummary {
            errors: lock(&self.stats).recorded_errors.clone(),
            status,
        }
    }
}

impl<C> Drop for ContinuousActionRunner<C> {
    fn drop(&mut self) {
        self.stop.set();
    }
}

async fn run_loop<C>(
    mut action: Box<dyn ContinuousAction<C>>,
    ctx: ActionContext<C>,
    delay: Duration,
    stats: Arc<Mutex<ActionStats>>,
) where
    C: Send + Sync + 'static,
{
    while !ctx.stop.is_set() {
        let tick = AssertUnwindSafe(async { action.perform(ctx.clone()).await });
        let outcome = tick
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(panicked(payload)));
        match outcome {
            Ok(()) => lock(&stats).record_success(),
            Err(err) => {
                debug!(error = %err, "continuous action failed");
                lock(&stats).record_error(&err);
            }
        }
        tokio::time::sleep(delay).await;
    }

    let mut stats = lock(&stats);
    stats.finish(Instant::now());
    info!(
        successes = stats.successes,
        errors = stats.errors,
        elapsed = ?stats.elapsed,
        "continuous action stopped"
    );
}

fn panicked(payload: Box<dyn Any + Send>) -> ActionError {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string());
    warn!(%message, "continuous action panicked");
    ActionError::new(ActionErrorKind::Other, format!("action panicked: {message}"))
}

fn lock(stats: &Mutex<ActionStats>) -> MutexGuard<'_, ActionStats> {
    stats.lock().unwrap_or_else(|e| e.into_inner())
}
