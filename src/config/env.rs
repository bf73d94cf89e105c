// src/config/env.rs

//! Environment overrides, read once.
//!
//! Lookups take an `&EnvOverrides` instead of calling `std::env::var` so
//! tests never mutate the process environment.

use std::ffi::OsString;
use std::path::PathBuf;

pub const BUILD_DIR_VAR: &str = "RETHINKDB_BUILD_DIR";
pub const EXECUTABLE_VAR: &str = "RDB_EXE_PATH";
pub const DRIVER_DIR_VAR: &str = "PYTHON_DRIVER_DIR";
pub const DRIVER_SRC_DIR_VAR: &str = "PYTHON_DRIVER_SRC_DIR";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    /// Build directory to use verbatim instead of scanning `<root>/build`.
    pub build_dir: Option<PathBuf>,
    /// Server executable to use verbatim.
    pub executable: Option<PathBuf>,
    /// Pre-built client driver directory.
    pub driver_dir: Option<PathBuf>,
    /// Client driver source directory.
    pub driver_src_dir: Option<PathBuf>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var_os(key))
    }

    /// Build from an arbitrary lookup; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<OsString>) -> Self {
        let get = |key: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
        };
        Self {
            build_dir: get(BUILD_DIR_VAR),
            executable: get(EXECUTABLE_VAR),
            driver_dir: get(DRIVER_DIR_VAR),
            driver_src_dir: get(DRIVER_SRC_DIR_VAR),
        }
    }

    /// Target for driver resolution when the caller gave none.
    pub fn driver_target(&self) -> Option<&PathBuf> {
        self.driver_dir.as_ref().or(self.driver_src_dir.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_values_are_ignored_and_driver_dir_wins() {
        let env = EnvOverrides::from_lookup(|key| match key {
            BUILD_DIR_VAR => Some(OsString::new()),
            DRIVER_DIR_VAR => Some("/opt/driver".into()),
            DRIVER_SRC_DIR_VAR => Some("/src/driver".into()),
            _ => None,
        });

        assert_eq!(env.build_dir, None);
        assert_eq!(env.driver_target(), Some(&PathBuf::from("/opt/driver")));
    }
}
