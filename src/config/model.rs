// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Configuration as read from a TOML file.
///
/// ```toml
/// [build]
/// project_root = "."
/// modes = ["release"]
/// executable = "rethinkdb"
///
/// [termination]
/// grace_timeout = "5s"
/// kill_timeout = "20s"
///
/// [runner]
/// delay = "10ms"
/// stop_timeout = "500ms"
///
/// [driver]
/// dir = "drivers/python"
/// build_notification_after = "2s"
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawHarnessConfig {
    #[serde(default)]
    pub build: BuildSection,

    #[serde(default)]
    pub termination: RawTerminationSection,

    #[serde(default)]
    pub runner: RawRunnerSection,

    #[serde(default)]
    pub driver: RawDriverSection,
}

/// `[build]` section: where build output lives and which flavour to pick.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildSection {
    /// Project checkout; build directories are scanned under `<root>/build`.
    #[serde(default = "default_project_root")]
    pub project_root: PathBuf,

    /// Accepted mode tags. Empty means `release` and `debug`.
    #[serde(default)]
    pub modes: Vec<String>,

    /// Name of the server binary inside a build directory.
    #[serde(default = "default_executable")]
    pub executable: String,
}

fn default_project_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_executable() -> String {
    "rethinkdb".to_string()
}

impl Default for BuildSection {
    fn default() -> Self {
        Self {
            project_root: default_project_root(),
            modes: Vec::new(),
            executable: default_executable(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawTerminationSection {
    #[serde(default = "default_grace_timeout")]
    pub grace_timeout: String,
    #[serde(default = "default_kill_timeout")]
    pub kill_timeout: String,
}

fn default_grace_timeout() -> String {
    "5s".to_string()
}

fn default_kill_timeout() -> String {
    "20s".to_string()
}

impl Default for RawTerminationSection {
    fn default() -> Self {
        Self {
            grace_timeout: default_grace_timeout(),
            kill_timeout: default_kill_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawRunnerSection {
    #[serde(default = "default_delay")]
    pub delay: String,
    #[serde(default = "default_stop_timeout")]
    pub stop_timeout: String,
}

fn default_delay() -> String {
    "10ms".to_string()
}

fn default_stop_timeout() -> String {
    "500ms".to_string()
}

impl Default for RawRunnerSection {
    fn default() -> Self {
        Self {
            delay: default_delay(),
            stop_timeout: default_stop_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawDriverSection {
    #[serde(default)]
    pub dir: Option<PathBuf>,
    #[serde(default = "default_build_notification_after")]
    pub build_notification_after: String,
}

fn default_build_notification_after() -> String {
    "2s".to_string()
}

impl Default for RawDriverSection {
    fn default() -> Self {
        Self {
            dir: None,
            build_notification_after: default_build_notification_after(),
        }
    }
}

/// Validated `[termination]` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminationSection {
    pub grace_timeout: Duration,
    pub kill_timeout: Duration,
}

/// Validated `[runner]` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerSection {
    pub delay: Duration,
    pub stop_timeout: Duration,
}

/// Validated `[driver]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverSection {
    pub dir: Option<PathBuf>,
    pub build_notification_after: Duration,
}

/// Validated configuration.
///
/// Only obtainable through `TryFrom<RawHarnessConfig>` (see
/// [`crate::config::validate`]) or [`HarnessConfig::default`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    pub build: BuildSection,
    pub termination: TerminationSection,
    pub runner: RunnerSection,
    pub driver: DriverSection,
}

impl HarnessConfig {
    pub(crate) fn new_unchecked(
        build: BuildSection,
        termination: TerminationSection,
        runner: RunnerSection,
        driver: DriverSection,
    ) -> Self {
        Self {
            build,
            termination,
            runner,
            driver,
        }
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            build: BuildSection::default(),
            termination: TerminationSection {
                grace_timeout: Duration::from_secs(5),
                kill_timeout: Duration::from_secs(20),
            },
            runner: RunnerSection {
                delay: Duration::from_millis(10),
                stop_timeout: Duration::from_millis(500),
            },
            driver: DriverSection {
                dir: None,
                build_notification_after: Duration::from_secs(2),
            },
        }
    }
}
