// src/config/validate.rs

use std::time::Duration;

use crate::config::model::{
    BuildSection, DriverSection, HarnessConfig, RawHarnessConfig, RunnerSection,
    TerminationSection,
};
use crate::errors::{HarnessError, Result};

impl TryFrom<RawHarnessConfig> for HarnessConfig {
    type Error = HarnessError;

    fn try_from(raw: RawHarnessConfig) -> std::result::Result<Self, Self::Error> {
        validate_build(&raw.build)?;

        let termination = TerminationSection {
            grace_timeout: section_duration("termination", "grace_timeout", &raw.termination.grace_timeout)?,
            kill_timeout: section_duration("termination", "kill_timeout", &raw.termination.kill_timeout)?,
        };
        let runner = RunnerSection {
            delay: section_duration("runner", "delay", &raw.runner.delay)?,
            stop_timeout: section_duration("runner", "stop_timeout", &raw.runner.stop_timeout)?,
        };
        let driver = DriverSection {
            dir: raw.driver.dir,
            build_notification_after: section_duration(
                "driver",
                "build_notification_after",
                &raw.driver.build_notification_after,
            )?,
        };

        Ok(HarnessConfig::new_unchecked(raw.build, termination, runner, driver))
    }
}

fn validate_build(build: &BuildSection) -> Result<()> {
    if build.executable.trim().is_empty() {
        return Err(HarnessError::ConfigError(
            "[build].executable must not be empty".to_string(),
        ));
    }
    if build.executable.contains('/') {
        return Err(HarnessError::ConfigError(format!(
            "[build].executable must be a bare file name (got '{}')",
            build.executable
        )));
    }
    for mode in build.modes.iter() {
        if mode.is_empty() || mode.contains('/') {
            return Err(HarnessError::ConfigError(format!(
                "[build].modes entries must be non-empty directory name prefixes (got '{}')",
                mode
            )));
        }
    }
    Ok(())
}

fn section_duration(section: &str, key: &str, value: &str) -> Result<Duration> {
    parse_duration(value)
        .map_err(|e| HarnessError::ConfigError(format!("[{section}].{key}: {e}")))
}

/// Parse a simple duration string like `"3s"`, `"250ms"`, `"1m"`, `"2h"`.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    // Find the boundary between digits and suffix.
    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    let secs_per_unit = match unit.as_str() {
        "ms" => return Ok(Duration::from_millis(value)),
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        _ => {
            return Err(format!(
                "unsupported duration unit '{}'; expected ms, s, m, or h",
                unit
            ))
        }
    };

    value
        .checked_mul(secs_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration '{}' is too large", s))
}
