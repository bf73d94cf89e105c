// src/artifact/locator.rs

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{debug, info};

use crate::config::{BuildSection, EnvOverrides};
use crate::errors::{HarnessError, Result};
use crate::fs::{absolutize, FileSystem};

/// Modes accepted when the caller does not ask for a specific one.
pub const DEFAULT_MODES: [&str; 2] = ["release", "debug"];

/// A candidate build output directory seen during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildDirectory {
    pub path: PathBuf,
    pub modified: SystemTime,
    /// The requested mode this directory matched.
    pub mode: String,
    pub has_executable: bool,
}

/// Expand an empty filter into [`DEFAULT_MODES`].
pub fn normalize_modes(modes: &[String]) -> Vec<String> {
    if modes.is_empty() {
        DEFAULT_MODES.iter().map(|m| m.to_string()).collect()
    } else {
        modes.to_vec()
    }
}

/// Return the first requested mode that `dir_name` belongs to.
///
/// A directory belongs to a mode when its lowercased name equals the mode or
/// its name starts with `"<mode>_"`.
pub fn mode_matches<'a>(dir_name: &str, modes: &'a [String]) -> Option<&'a str> {
    let lowered = dir_name.to_lowercase();
    modes
        .iter()
        .find(|mode| lowered == **mode || dir_name.starts_with(&format!("{mode}_")))
        .map(|m| m.as_str())
}

/// Look for the most recently built version of the project.
///
/// - `overrides.build_dir` is trusted verbatim (no scan), but the executable
///   check still applies when `require_executable` is set.
/// - Otherwise the immediate children of `<project_root>/build` are scanned.
pub fn latest_build_dir(
    fs: &dyn FileSystem,
    overrides: &EnvOverrides,
    project_root: &Path,
    modes: &[String],
    executable: &str,
    require_executable: bool,
) -> Result<PathBuf> {
    let chosen = match overrides.build_dir.as_deref() {
        Some(dir) => {
            let dir = fs.canonicalize(dir).unwrap_or_else(|_| absolutize(dir));
            debug!(path = %dir.display(), "using build directory override");
            dir
        }
        None => scan_build_root(fs, project_root, modes, executable, require_executable)?.path,
    };

    if require_executable && !fs.is_executable(&chosen.join(executable)) {
        return Err(HarnessError::not_built(format!(
            "the {} server executable was not present/runnable in: {}",
            executable,
            chosen.display()
        )));
    }

    Ok(chosen)
}

fn scan_build_root(
    fs: &dyn FileSystem,
    project_root: &Path,
    modes: &[String],
    executable: &str,
    require_executable: bool,
) -> Result<BuildDirectory> {
    let build_root = project_root.join("build");
    if !fs.is_dir(&build_root) {
        return Err(HarnessError::not_built(format!(
            "no version of this project has yet been built (missing {})",
            build_root.display()
        )));
    }

    let modes = normalize_modes(modes);
    let mut best: Option<BuildDirectory> = None;

    for path in fs.read_dir(&build_root)? {
        if !fs.is_dir(&path) {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(mode) = mode_matches(name, &modes) else {
            continue;
        };

        let has_executable = fs.is_file(&path.join(executable));
        if require_executable && !has_executable {
            debug!(path = %path.display(), "skipping build directory without executable");
            continue;
        }

        let modified = fs.modified(&path)?;
        let candidate = BuildDirectory {
            path,
            modified,
            mode: mode.to_string(),
            has_executable,
        };

        // Ties keep whichever candidate was seen first.
        if best.as_ref().is_none_or(|b| candidate.modified > b.modified) {
            best = Some(candidate);
        }
    }

    let best = best.ok_or_else(|| {
        HarnessError::not_built(format!(
            "no built version of the server could be found in {} (modes: {})",
            build_root.display(),
            modes.join(", ")
        ))
    })?;

    info!(path = %best.path.display(), mode = %best.mode, "selected build directory");
    Ok(best)
}

/// Locate the server executable.
///
/// `overrides.executable` wins outright; otherwise the binary inside the
/// latest matching build directory is used. Either way the result must be
/// executable.
pub fn find_server_executable(
    fs: &dyn FileSystem,
    overrides: &EnvOverrides,
    project_root: &Path,
    modes: &[String],
    executable: &str,
) -> Result<PathBuf> {
    let path = match overrides.executable.as_deref() {
        Some(exe) => absolutize(exe),
        None => latest_build_dir(fs, overrides, project_root, modes, executable, true)?
            .join(executable),
    };

    if !fs.is_executable(&path) {
        return Err(HarnessError::not_built(format!(
            "the server executable is not available: {}",
            path.display()
        )));
    }

    Ok(path)
}

/// Convenience bundle of the inputs every lookup needs.
#[derive(Debug)]
pub struct Locator<'a> {
    fs: &'a dyn FileSystem,
    overrides: &'a EnvOverrides,
    build: &'a BuildSection,
}

impl<'a> Locator<'a> {
    pub fn new(fs: &'a dyn FileSystem, overrides: &'a EnvOverrides, build: &'a BuildSection) -> Self {
        Self {
            fs,
            overrides,
            build,
        }
    }

    /// Latest build directory for `modes`, or the configured modes when empty.
    pub fn build_dir(&self, modes: &[String], require_executable: bool) -> Result<PathBuf> {
        latest_build_dir(
            self.fs,
            self.overrides,
            &self.build.project_root,
            self.effective_modes(modes),
            &self.build.executable,
            require_executable,
        )
    }

    pub fn server_executable(&self, modes: &[String]) -> Result<PathBuf> {
        find_server_executable(
            self.fs,
            self.overrides,
            &self.build.project_root,
            self.effective_modes(modes),
            &self.build.executable,
        )
    }

    fn effective_modes<'m>(&'m self, modes: &'m [String]) -> &'m [String] {
        if modes.is_empty() {
            &self.build.modes
        } else {
            modes
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn modes(m: &[&str]) -> Vec<String> {
        m.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn exact_and_prefixed_names_match() {
        let release = modes(&["release"]);
        assert_eq!(mode_matches("release", &release), Some("release"));
        assert_eq!(mode_matches("RELEASE", &release), Some("release"));
        assert_eq!(mode_matches("release_clang", &release), Some("release"));
        assert_eq!(mode_matches("releases", &release), None);
        assert_eq!(mode_matches("debug_x", &release), None);
    }

    #[test]
    fn empty_filter_means_release_and_debug() {
        assert_eq!(normalize_modes(&[]), modes(&["release", "debug"]));
        assert_eq!(normalize_modes(&modes(&["debug"])), modes(&["debug"]));
    }
}
