// src/driver/layout.rs

use std::path::{Path, PathBuf};

use crate::errors::{HarnessError, Result};
use crate::fs::FileSystem;

/// On-disk shape of a client driver inside the project tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverLayout {
    pub language: &'static str,
    pub extension: &'static str,
    /// Directory name the loader looks for in each search root.
    pub package: &'static str,
    /// Files a source folder must hold. The first one is the entry marker.
    pub source_markers: &'static [&'static str],
    /// Generated file that only exists once the driver was built.
    pub schema: &'static str,
    /// Built package directory, relative to the project root.
    pub built_rel: &'static str,
    /// Driver source tree (what gets built), relative to the project root.
    pub source_rel: &'static str,
    /// Directories that identify a project checkout.
    pub project_markers: &'static [&'static str],
    /// Build file expected next to a source folder.
    pub build_file: &'static str,
}

const PROJECT_MARKERS: &[&str] = &["src", "drivers", "admin"];

impl DriverLayout {
    pub fn python() -> Self {
        Self {
            language: "python",
            extension: "py",
            package: "rethinkdb",
            source_markers: &["__init__.py", "ast.py", "docs.py"],
            schema: "ql2_pb2.py",
            built_rel: "build/drivers/python/rethinkdb",
            source_rel: "drivers/python",
            project_markers: PROJECT_MARKERS,
            build_file: "Makefile",
        }
    }

    pub fn javascript() -> Self {
        Self {
            language: "javascript",
            extension: "js",
            package: "js",
            source_markers: &["rethinkdb.js"],
            schema: "proto-def.js",
            built_rel: "build/packages/js",
            source_rel: "drivers/javascript",
            project_markers: PROJECT_MARKERS,
            build_file: "Makefile",
        }
    }

    pub fn ruby() -> Self {
        Self {
            language: "ruby",
            extension: "rb",
            package: "lib",
            source_markers: &["rethinkdb.rb"],
            schema: "ql2.pb.rb",
            built_rel: "build/drivers/ruby/lib",
            source_rel: "drivers/ruby",
            project_markers: PROJECT_MARKERS,
            build_file: "Makefile",
        }
    }

    pub fn entry_marker(&self) -> &'static str {
        self.source_markers.first().copied().unwrap_or(self.package)
    }

    /// Directory named after the package holding every source marker.
    pub fn is_source_folder(&self, fs: &dyn FileSystem, path: &Path) -> bool {
        self.named_after_package(path)
            && self
                .source_markers
                .iter()
                .all(|marker| fs.is_file(&path.join(marker)))
    }

    /// Source folder that also carries the generated schema.
    pub fn is_built(&self, fs: &dyn FileSystem, path: &Path) -> bool {
        self.is_source_folder(fs, path) && fs.is_file(&path.join(self.schema))
    }

    pub fn is_project_root(&self, fs: &dyn FileSystem, path: &Path) -> bool {
        self.project_markers
            .iter()
            .all(|marker| fs.is_dir(&path.join(marker)))
    }

    pub fn named_after_package(&self, path: &Path) -> bool {
        path.file_name().is_some_and(|name| name == self.package)
    }

    /// Directory the build of a source folder places the driver in.
    ///
    /// `source_dir` is the build directory (`<root>/<source_rel>`); the
    /// project root is found by walking back up `source_rel`.
    fn built_dir_for_source(&self, source_dir: &Path) -> PathBuf {
        let depth = Path::new(self.source_rel).components().count();
        let root = source_dir
            .ancestors()
            .nth(depth)
            .unwrap_or(source_dir);
        root.join(self.built_rel)
    }
}

/// What kind of directory a driver target turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverSource {
    /// A project checkout; the driver is built from `<root>/<source_rel>`.
    Project { driver_dir: PathBuf, build_dir: PathBuf },
    /// Already complete: source, build output, or an installed copy.
    Built { driver_dir: PathBuf },
    /// A source folder inside a buildable driver tree.
    Source { driver_dir: PathBuf, build_dir: PathBuf },
}

impl DriverSource {
    pub fn driver_dir(&self) -> &Path {
        match self {
            DriverSource::Project { driver_dir, .. }
            | DriverSource::Built { driver_dir }
            | DriverSource::Source { driver_dir, .. } => driver_dir,
        }
    }

    /// Directory to run the build in, `None` when nothing needs building.
    pub fn build_dir(&self) -> Option<&Path> {
        match self {
            DriverSource::Project { build_dir, .. } | DriverSource::Source { build_dir, .. } => {
                Some(build_dir)
            }
            DriverSource::Built { .. } => None,
        }
    }
}

/// Classify a canonical target directory.
///
/// When `target` is not itself named after the package but contains a
/// package directory, that directory is classified instead.
pub fn classify(fs: &dyn FileSystem, layout: &DriverLayout, target: &Path) -> Result<DriverSource> {
    let nested = target.join(layout.package);
    let target = if !layout.named_after_package(target) && fs.is_dir(&nested) {
        nested
    } else {
        target.to_path_buf()
    };

    if layout.is_project_root(fs, &target) {
        return Ok(DriverSource::Project {
            driver_dir: target.join(layout.built_rel),
            build_dir: target.join(layout.source_rel),
        });
    }

    if layout.is_built(fs, &target) {
        return Ok(DriverSource::Built { driver_dir: target });
    }

    if layout.is_source_folder(fs, &target) {
        if let Some(parent) = target.parent() {
            if fs.is_file(&parent.join(layout.build_file)) {
                return Ok(DriverSource::Source {
                    driver_dir: layout.built_dir_for_source(parent),
                    build_dir: parent.to_path_buf(),
                });
            }
        }
    }

    Err(HarnessError::usage(format!(
        "unable to determine the {} driver locations from: {}",
        layout.language,
        target.display()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn python_sources(fs: &MockFileSystem, dir: &str) {
        for marker in ["__init__.py", "ast.py", "docs.py"] {
            fs.add_file(format!("{dir}/{marker}"), "");
        }
    }

    #[test]
    fn project_checkout_builds_from_the_driver_tree() {
        let fs = MockFileSystem::new();
        for dir in ["src", "drivers", "admin"] {
            fs.add_dir(format!("/proj/{dir}"));
        }

        let source = classify(&fs, &DriverLayout::python(), Path::new("/proj")).unwrap();
        assert_eq!(
            source,
            DriverSource::Project {
                driver_dir: PathBuf::from("/proj/build/drivers/python/rethinkdb"),
                build_dir: PathBuf::from("/proj/drivers/python"),
            }
        );
    }

    #[test]
    fn complete_package_is_used_as_is_after_descending_into_it() {
        let fs = MockFileSystem::new();
        python_sources(&fs, "/site/rethinkdb");
        fs.add_file("/site/rethinkdb/ql2_pb2.py", "");

        let source = classify(&fs, &DriverLayout::python(), Path::new("/site")).unwrap();
        assert_eq!(
            source,
            DriverSource::Built {
                driver_dir: PathBuf::from("/site/rethinkdb")
            }
        );
        assert_eq!(source.build_dir(), None);
    }

    #[test]
    fn source_folder_maps_to_the_build_output_of_its_project() {
        let fs = MockFileSystem::new();
        python_sources(&fs, "/proj/drivers/python/rethinkdb");
        fs.add_file("/proj/drivers/python/Makefile", "all:\n");

        let source = classify(
            &fs,
            &DriverLayout::python(),
            Path::new("/proj/drivers/python/rethinkdb"),
        )
        .unwrap();
        assert_eq!(
            source,
            DriverSource::Source {
                driver_dir: PathBuf::from("/proj/build/drivers/python/rethinkdb"),
                build_dir: PathBuf::from("/proj/drivers/python"),
            }
        );
    }

    #[test]
    fn source_folder_without_build_file_is_rejected() {
        let fs = MockFileSystem::new();
        python_sources(&fs, "/loose/rethinkdb");

        let err = classify(&fs, &DriverLayout::python(), Path::new("/loose/rethinkdb")).unwrap_err();
        assert!(matches!(err, HarnessError::Usage(_)));
    }

    #[test]
    fn entry_marker_is_the_first_source_marker() {
        assert_eq!(DriverLayout::python().entry_marker(), "__init__.py");
        assert_eq!(DriverLayout::ruby().entry_marker(), "rethinkdb.rb");
    }
}
