// src/cli.rs

//! CLI argument parsing using `clap`.
//!
//! The binary is a thin shell over the library so scripts that launch
//! servers can reuse the same locator, terminator and probes.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for `rdb-harness`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "rdb-harness",
    version,
    about = "Process lifecycle helpers for clustered database integration tests.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `$RDB_HARNESS_CONFIG`, else `Harness.toml` in the current
    /// working directory if it exists, else built-in defaults.
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `RDB_HARNESS_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Print the path of the latest server executable.
    Locate {
        /// Accepted build mode prefix; repeatable. Defaults to the configured
        /// modes.
        #[arg(long = "mode", value_name = "MODE")]
        modes: Vec<String>,

        /// Print the build directory instead of the executable.
        #[arg(long)]
        dir_only: bool,
    },

    /// Terminate every process in a process group.
    KillGroup {
        /// Process group id.
        #[arg(value_name = "PGID")]
        group: String,

        /// Seconds to wait after SIGTERM before escalating to SIGKILL.
        #[arg(long, value_name = "SECS", allow_negative_numbers = true)]
        grace: Option<f64>,

        /// Seconds to keep sending SIGKILL before giving up.
        #[arg(long, value_name = "SECS", allow_negative_numbers = true)]
        timeout: Option<f64>,
    },

    /// Print a TCP port that is currently free.
    FreePort {
        #[arg(long, value_name = "HOST", default_value = crate::probe::DEFAULT_INTERFACE)]
        interface: String,
    },

    /// Print whether the terminal supports colours.
    Colors,

    /// Resolve, build if needed, and load the client driver.
    Driver {
        /// Project checkout, driver source folder or built driver.
        #[arg(value_name = "DIR")]
        target: Option<PathBuf>,
    },
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kill_group_takes_optional_fractional_timeouts() {
        let args =
            CliArgs::try_parse_from(["rdb-harness", "kill-group", "4242", "--grace", "0.5"])
                .unwrap();
        match args.command {
            Command::KillGroup {
                group,
                grace,
                timeout,
            } => {
                assert_eq!(group, "4242");
                assert_eq!(grace, Some(0.5));
                assert_eq!(timeout, None);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn locate_accepts_repeated_modes_and_global_flags_after_the_subcommand() {
        let args = CliArgs::try_parse_from([
            "rdb-harness",
            "locate",
            "--mode",
            "release",
            "--mode",
            "debug_clang",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert!(matches!(args.log_level, Some(LogLevel::Debug)));
        match args.command {
            Command::Locate { modes, dir_only } => {
                assert_eq!(modes, vec!["release", "debug_clang"]);
                assert!(!dir_only);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
