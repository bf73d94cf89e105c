// src/errors.rs

//! Crate-wide error type.
//!
//! Only the fatal kinds cross component boundaries. A continuous action that
//! fails is *data* (see [`crate::action::ActionError`]) and a runner that does
//! not stop in time is reported through [`crate::action::StopStatus`], not
//! through this enum.

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarnessError {
    /// Malformed caller input (bad group id, bad timeout, bad path shape).
    #[error("Usage error: {0}")]
    Usage(String),

    /// A required artifact is missing or failed to build.
    #[error("Not built: {detail}")]
    NotBuilt {
        detail: String,
        /// Captured build tool output, when a build was attempted.
        build_output: Option<String>,
    },

    #[error(
        "Unable to kill all of the processes for process group {group} after {elapsed:?}:\n{listing}"
    )]
    TerminationTimeout {
        group: i32,
        elapsed: Duration,
        listing: String,
    },

    #[error("Failed to signal process group {group}: {source}")]
    Signal {
        group: i32,
        #[source]
        source: nix::errno::Errno,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HarnessError {
    pub fn usage(msg: impl Into<String>) -> Self {
        HarnessError::Usage(msg.into())
    }

    pub fn not_built(detail: impl Into<String>) -> Self {
        HarnessError::NotBuilt {
            detail: detail.into(),
            build_output: None,
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, HarnessError>;
