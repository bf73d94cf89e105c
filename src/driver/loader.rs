// src/driver/loader.rs

//! Scoped loading of a driver package.
//!
//! Loading never touches global state: the caller owns a [`SearchPath`] and
//! the driver's parent directory is pushed onto it only for the duration of
//! the lookup, through a [`SearchPathGuard`].

use std::ops::Deref;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::driver::layout::DriverLayout;
use crate::errors::{HarnessError, Result};
use crate::fs::FileSystem;

/// Ordered list of directories a package is looked up in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPath {
    roots: Vec<PathBuf>,
}

impl SearchPath {
    pub fn new(roots: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            roots: roots.into_iter().collect(),
        }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Put `root` first until the returned guard is dropped.
    pub fn scoped(&mut self, root: PathBuf) -> SearchPathGuard<'_> {
        let saved = self.roots.clone();
        self.roots.insert(0, root);
        SearchPathGuard { path: self, saved }
    }

    /// First `<root>/<package>` directory holding the entry marker.
    pub fn find_package(&self, fs: &dyn FileSystem, layout: &DriverLayout) -> Option<PathBuf> {
        self.roots
            .iter()
            .map(|root| root.join(layout.package))
            .find(|dir| fs.is_file(&dir.join(layout.entry_marker())))
    }
}

/// Restores the previous roots of a [`SearchPath`] when dropped, including
/// during unwinding.
#[derive(Debug)]
pub struct SearchPathGuard<'a> {
    path: &'a mut SearchPath,
    saved: Vec<PathBuf>,
}

impl Deref for SearchPathGuard<'_> {
    type Target = SearchPath;

    fn deref(&self) -> &SearchPath {
        self.path
    }
}

impl Drop for SearchPathGuard<'_> {
    fn drop(&mut self) {
        self.path.roots = std::mem::take(&mut self.saved);
    }
}

/// A resolved driver directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverLocation {
    pub root: PathBuf,
    /// True when resolution ran a build to produce it.
    pub built: bool,
}

/// A loaded driver package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverHandle {
    pub location: DriverLocation,
    /// Canonical directory the package was actually loaded from.
    pub origin: PathBuf,
    /// Generated schema file inside `origin`.
    pub schema: PathBuf,
}

/// Load the package at `location` with its parent scoped onto `search_path`.
///
/// # Panics
///
/// If the package is found anywhere other than inside `location.root`.
pub fn load_driver(
    fs: &dyn FileSystem,
    search_path: &mut SearchPath,
    layout: &DriverLayout,
    location: DriverLocation,
) -> Result<DriverHandle> {
    let expected = fs.canonicalize(&location.root)?;
    let parent = location
        .root
        .parent()
        .ok_or_else(|| {
            HarnessError::usage(format!(
                "driver directory has no parent: {}",
                location.root.display()
            ))
        })?
        .to_path_buf();

    let guard = search_path.scoped(parent);
    let package = guard.find_package(fs, layout).ok_or_else(|| {
        HarnessError::not_built(format!(
            "no {} package found on search path {:?}",
            layout.package,
            guard.roots()
        ))
    })?;
    let origin = fs.canonicalize(&package)?;

    assert!(
        origin.starts_with(&expected),
        "the wrong copy of the {} driver got loaded: it should have come from {} but came from {}",
        layout.language,
        expected.display(),
        origin.display()
    );
    drop(guard);

    debug!(origin = %origin.display(), "driver loaded");
    Ok(DriverHandle {
        schema: origin.join(layout.schema),
        origin,
        location,
    })
}

/// Whether `dir` can be loaded as the driver package.
pub fn is_loadable(fs: &dyn FileSystem, layout: &DriverLayout, dir: &Path) -> bool {
    fs.is_dir(dir)
        && layout.named_after_package(dir)
        && fs.is_file(&dir.join(layout.entry_marker()))
}
