// src/artifact/mod.rs

//! Build artifact discovery.
//!
//! Finds the most recently built server for the requested build flavour.
//! Build output lives in `<project_root>/build/<mode>[_<suffix>]/`, e.g.
//! `build/release`, `build/debug_clang`.

pub mod locator;

pub use locator::{
    find_server_executable, latest_build_dir, mode_matches, normalize_modes, BuildDirectory,
    Locator, DEFAULT_MODES,
};
