//! Managed working directory for the proxy process.
//!
//! Certificate, key and middleware files referenced by the configuration are
//! staged into a temporary directory that becomes the child's working
//! directory, so the launch arguments can use bare file names. The directory
//! is purged on close and removed on drop either way.

use crate::error::Result;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

#[derive(Debug, Default)]
pub struct WorkingDir {
    dir: Option<TempDir>,
}

impl WorkingDir {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the directory if it does not exist yet and return its path.
    pub fn ensure(&mut self) -> Result<&Path> {
        if self.dir.is_none() {
            let dir = tempfile::Builder::new().prefix("tether-").tempdir()?;
            debug!(path = %dir.path().display(), "created proxy working directory");
            self.dir = Some(dir);
        }
        let dir = self.dir.as_ref().expect("working directory created above");
        Ok(dir.path())
    }

    pub fn path(&self) -> Option<&Path> {
        self.dir.as_ref().map(TempDir::path)
    }

    /// Copy a resource into the directory under `name`, returning the staged
    /// path.
    pub fn stage(&mut self, source: &Path, name: &str) -> Result<PathBuf> {
        let target = self.ensure()?.join(name);
        std::fs::copy(source, &target)?;
        debug!(source = %source.display(), target = %target.display(), "staged proxy resource");
        Ok(target)
    }

    /// Delete the directory and everything staged into it. Safe to call when
    /// nothing was ever created, and more than once.
    pub fn purge(&mut self) {
        if let Some(dir) = self.dir.take() {
            let path = dir.path().to_path_buf();
            if let Err(e) = dir.close() {
                warn!(path = %path.display(), "failed to remove proxy working directory: {e}");
            }
        }
    }
}
