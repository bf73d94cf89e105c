// src/config/mod.rs

//! Harness configuration.
//!
//! - [`model`] holds the TOML shape (`RawHarnessConfig`) and the validated
//!   `HarnessConfig`.
//! - [`loader`] reads a file from disk.
//! - [`validate`] turns raw config into validated config.
//! - [`env`] captures the environment overrides once so lookups stay pure.

pub mod env;
pub mod loader;
pub mod model;
pub mod validate;

pub use env::EnvOverrides;
pub use loader::{default_config_path, load_and_validate, load_from_path, load_or_default};
pub use model::{
    BuildSection, DriverSection, HarnessConfig, RawHarnessConfig, RunnerSection,
    TerminationSection,
};
pub use validate::parse_duration;
