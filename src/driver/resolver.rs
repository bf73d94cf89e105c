// src/driver/resolver.rs

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::EnvOverrides;
use crate::driver::build::Builder;
use crate::driver::layout::{classify, DriverLayout, DriverSource};
use crate::driver::loader::{is_loadable, load_driver, DriverHandle, DriverLocation, SearchPath};
use crate::errors::{HarnessError, Result};
use crate::fs::FileSystem;

/// Finds, builds if needed, and loads a client driver.
///
/// Target precedence when [`DriverResolver::resolve`] gets `None`: the
/// driver environment overrides, then the configured default target, then
/// the project root.
pub struct DriverResolver<'a, B> {
    fs: &'a dyn FileSystem,
    builder: B,
    overrides: &'a EnvOverrides,
    project_root: PathBuf,
    default_target: Option<PathBuf>,
    layout: DriverLayout,
    search_path: SearchPath,
}

impl<'a, B: Builder> DriverResolver<'a, B> {
    pub fn new(
        fs: &'a dyn FileSystem,
        builder: B,
        overrides: &'a EnvOverrides,
        project_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            fs,
            builder,
            overrides,
            project_root: project_root.into(),
            default_target: None,
            layout: DriverLayout::python(),
            search_path: SearchPath::default(),
        }
    }

    pub fn with_layout(mut self, layout: DriverLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Target used when neither the caller nor the environment names one.
    /// Relative paths are taken from the project root.
    pub fn with_default_target(mut self, target: Option<PathBuf>) -> Self {
        self.default_target = target.map(|t| self.project_root.join(t));
        self
    }

    pub fn with_search_path(mut self, search_path: SearchPath) -> Self {
        self.search_path = search_path;
        self
    }

    pub fn search_path(&self) -> &SearchPath {
        &self.search_path
    }

    pub fn layout(&self) -> &DriverLayout {
        &self.layout
    }

    /// The target that `resolve(None)` would use.
    pub fn effective_target(&self) -> PathBuf {
        self.overrides
            .driver_target()
            .cloned()
            .or_else(|| self.default_target.clone())
            .unwrap_or_else(|| self.project_root.clone())
    }

    /// Classify `target` without building anything.
    pub fn inspect(&self, target: Option<&Path>) -> Result<DriverSource> {
        let target = match target {
            Some(t) => t.to_path_buf(),
            None => self.effective_target(),
        };

        if !self.fs.is_dir(&target) {
            return Err(HarnessError::usage(format!(
                "driver target is not a directory: {}",
                target.display()
            )));
        }
        let target = self.fs.canonicalize(&target)?;
        classify(self.fs, &self.layout, &target)
    }

    /// Resolve `target` to a loaded driver, building it first when the
    /// target is a project checkout or a source folder.
    pub async fn resolve(&mut self, target: Option<&Path>) -> Result<DriverHandle> {
        let source = self.inspect(target)?;
        debug!(?source, language = self.layout.language, "classified driver target");

        let built = match source.build_dir() {
            Some(build_dir) => {
                info!(dir = %build_dir.display(), language = self.layout.language, "building driver");
                self.builder.build(build_dir).await.map_err(|e| match e {
                    HarnessError::NotBuilt { build_output, .. } => HarnessError::NotBuilt {
                        detail: format!(
                            "failed making {} driver from: {}",
                            self.layout.language,
                            build_dir.display()
                        ),
                        build_output,
                    },
                    other => other,
                })?;
                true
            }
            None => false,
        };

        let driver_dir = source.driver_dir();
        if !is_loadable(self.fs, &self.layout, driver_dir) {
            return Err(HarnessError::usage(format!(
                "invalid {} driver directory: {}",
                self.layout.language,
                driver_dir.display()
            )));
        }

        let location = DriverLocation {
            root: driver_dir.to_path_buf(),
            built,
        };
        load_driver(self.fs, &mut self.search_path, &self.layout, location)
    }
}
