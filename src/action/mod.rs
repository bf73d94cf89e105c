// src/action/mod.rs

//! Continuous background actions.
//!
//! A [`ContinuousActionRunner`] repeatedly performs a caller-supplied
//! [`ContinuousAction`] against a shared connection until asked to stop,
//! counting successes and tallying failures by description. It is how
//! scenarios keep load on a cluster while they kill and restart servers.
//!
//! - [`error`] defines [`ActionError`] and the pure classification.
//! - [`stats`] holds the counters ([`ActionStats`]).
//! - [`runner`] owns the tokio task and the stop handshake.

pub mod error;
pub mod runner;
pub mod stats;

pub use error::{classify, describe, ActionError, ActionErrorKind};
pub use runner::{
    ActionContext, ActionFuture, ContinuousAction, ContinuousActionRunner, ErrorSummary,
    RunnerOptions, StopSignal, StopStatus,
};
pub use stats::ActionStats;
