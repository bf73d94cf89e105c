// src/driver/build.rs

//! Building driver sources.
//!
//! Resolution talks to a [`Builder`] instead of spawning `make` directly so
//! tests can substitute a fake that records requests and fabricates output.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::process::Stdio;
use std::time::Duration;

use anyhow::Context;
use tokio::process::Command;
use tracing::{debug, info};

use crate::errors::{HarnessError, Result};

pub type BuildFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// Trait abstracting how a directory gets built.
///
/// A failed build must be reported as [`HarnessError::NotBuilt`] carrying
/// whatever output the build produced.
pub trait Builder: Send + Sync {
    fn build<'a>(&'a self, dir: &'a Path) -> BuildFuture<'a>;
}

impl<B: Builder + ?Sized> Builder for &B {
    fn build<'a>(&'a self, dir: &'a Path) -> BuildFuture<'a> {
        (**self).build(dir)
    }
}

/// Runs `make -C <dir>` with stdout and stderr captured to a temp file.
#[derive(Debug, Clone)]
pub struct MakeBuilder {
    program: PathBuf,
    notify_after: Duration,
    notification: String,
}

impl MakeBuilder {
    pub fn new(notify_after: Duration) -> Self {
        Self {
            program: PathBuf::from("make"),
            notify_after,
            notification: "Building the driver. This may take a few moments.".to_string(),
        }
    }

    /// Use another make-compatible program (it must accept `-C <dir>`).
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Message logged when the build is still running after `notify_after`.
    pub fn with_notification(mut self, message: impl Into<String>) -> Self {
        self.notification = message.into();
        self
    }

    async fn run(&self, dir: &Path) -> Result<()> {
        let output = tempfile::NamedTempFile::new().context("creating build output file")?;
        let stdout = output.reopen()?;
        let stderr = stdout.try_clone()?;

        debug!(program = %self.program.display(), dir = %dir.display(), "starting build");
        let mut child = Command::new(&self.program)
            .arg("-C")
            .arg(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("spawning {} for {}", self.program.display(), dir.display()))?;

        let status = match tokio::time::timeout(self.notify_after, child.wait()).await {
            Ok(status) => status?,
            Err(_) => {
                info!(dir = %dir.display(), "{}", self.notification);
                child.wait().await?
            }
        };

        if status.success() {
            debug!(dir = %dir.display(), "build finished");
            return Ok(());
        }

        let captured = std::fs::read(output.path()).unwrap_or_default();
        Err(HarnessError::NotBuilt {
            detail: format!("failed making: {}", dir.display()),
            build_output: Some(String::from_utf8_lossy(&captured).into_owned()),
        })
    }
}

impl Default for MakeBuilder {
    fn default() -> Self {
        Self::new(Duration::from_secs(2))
    }
}

impl Builder for MakeBuilder {
    fn build<'a>(&'a self, dir: &'a Path) -> BuildFuture<'a> {
        Box::pin(self.run(dir))
    }
}
