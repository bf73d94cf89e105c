//! Scriptable [`Builder`] for driver resolution tests.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use rdb_harness::driver::{BuildFuture, Builder};
use rdb_harness::errors::HarnessError;
use rdb_harness::fs::mock::MockFileSystem;

#[derive(Debug, Clone, Default)]
enum Outcome {
    #[default]
    Succeed,
    Fail(String),
}

/// Records every build request.
///
/// On success it can write files into a [`MockFileSystem`], standing in for
/// what `make` would have produced. Clones share the recorded builds.
#[derive(Debug, Clone, Default)]
pub struct FakeBuilder {
    outcome: Outcome,
    fs: Option<MockFileSystem>,
    produces: Vec<PathBuf>,
    builds: Arc<Mutex<Vec<PathBuf>>>,
}

impl FakeBuilder {
    pub fn succeeding() -> Self {
        Self::default()
    }

    /// Every build fails with `output` as the captured build log.
    pub fn failing(output: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Fail(output.into()),
            ..Self::default()
        }
    }

    /// Create `files` (empty) in `fs` whenever a build succeeds.
    pub fn producing<I, P>(mut self, fs: &MockFileSystem, files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.fs = Some(fs.clone());
        self.produces = files.into_iter().map(Into::into).collect();
        self
    }

    pub fn builds(&self) -> Vec<PathBuf> {
        self.builds.lock().unwrap().clone()
    }
}

impl Builder for FakeBuilder {
    fn build<'a>(&'a self, dir: &'a Path) -> BuildFuture<'a> {
        Box::pin(async move {
            self.builds.lock().unwrap().push(dir.to_path_buf());
            match &self.outcome {
                Outcome::Succeed => {
                    if let Some(fs) = &self.fs {
                        for file in &self.produces {
                            fs.add_file(file, "");
                        }
                    }
                    Ok(())
                }
                Outcome::Fail(output) => Err(HarnessError::NotBuilt {
                    detail: format!("failed making: {}", dir.display()),
                    build_output: Some(output.clone()),
                }),
            }
        })
    }
}
