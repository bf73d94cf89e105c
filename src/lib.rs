// src/lib.rs

pub mod action;
pub mod artifact;
pub mod cli;
pub mod config;
pub mod driver;
pub mod errors;
pub mod fs;
pub mod logging;
pub mod probe;
pub mod terminate;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::artifact::Locator;
use crate::cli::{CliArgs, Command};
use crate::config::{load_or_default, EnvOverrides};
use crate::driver::{DriverResolver, MakeBuilder};
use crate::errors::HarnessError;
use crate::fs::RealFileSystem;
use crate::terminate::{kill_process_group, ProcessGroupId, TerminationPolicy};

/// High-level entry point used by `main.rs`.
///
/// Loads config and environment overrides once, then runs one subcommand.
/// Results go to stdout, logs to stderr.
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_or_default(args.config.as_deref())?;
    let overrides = EnvOverrides::from_env();
    let fs = RealFileSystem;
    debug!(?cfg, ?overrides, "configuration loaded");

    match args.command {
        Command::Locate { modes, dir_only } => {
            let locator = Locator::new(&fs, &overrides, &cfg.build);
            let path = if dir_only {
                locator.build_dir(&modes, false)?
            } else {
                locator.server_executable(&modes)?
            };
            println!("{}", path.display());
        }

        Command::KillGroup {
            group,
            grace,
            timeout,
        } => {
            let group: ProcessGroupId = group.parse()?;
            let base = TerminationPolicy::from(cfg.termination);
            let policy = TerminationPolicy::from_secs_f64(
                grace.unwrap_or(base.grace_timeout.as_secs_f64()),
                timeout.unwrap_or(base.kill_timeout.as_secs_f64()),
            )?;

            let outcome = tokio::task::spawn_blocking(move || kill_process_group(group, policy))
                .await
                .context("termination task panicked")??;
            info!(
                group = %outcome.group,
                phase = ?outcome.confirmed_in,
                elapsed = ?outcome.elapsed,
                "process group terminated"
            );
        }

        Command::FreePort { interface } => {
            println!("{}", probe::available_port(&interface)?);
        }

        Command::Colors => {
            println!("{}", probe::supports_terminal_colors());
        }

        Command::Driver { target } => {
            let builder = MakeBuilder::new(cfg.driver.build_notification_after)
                .with_notification("Building the python drivers. This may take a few moments.");
            let mut resolver =
                DriverResolver::new(&fs, builder, &overrides, cfg.build.project_root.clone())
                    .with_default_target(cfg.driver.dir.clone());

            let handle = resolver
                .resolve(target.as_deref())
                .await
                .inspect_err(print_build_output)?;
            info!(
                origin = %handle.origin.display(),
                built = handle.location.built,
                "driver loaded"
            );
            println!("{}", handle.origin.display());
        }
    }

    Ok(())
}

fn print_build_output(err: &HarnessError) {
    if let HarnessError::NotBuilt {
        build_output: Some(output),
        ..
    } = err
    {
        eprintln!("{output}");
    }
}
