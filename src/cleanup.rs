use crate::runtime::Runtime;
use log::{debug, warn};
use std::path::{Path, PathBuf};

/// RAII guard that removes a scratch file when dropped, on every exit path
pub struct ScratchFileGuard<'a, R: Runtime> {
    runtime: &'a R,
    path: PathBuf,
}

impl<'a, R: Runtime> ScratchFileGuard<'a, R> {
    pub fn new(runtime: &'a R, path: impl Into<PathBuf>) -> Self {
        Self {
            runtime,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<R: Runtime> Drop for ScratchFileGuard<'_, R> {
    fn drop(&mut self) {
        if !self.runtime.exists(&self.path) {
            return;
        }
        debug!("Cleaning up: {:?}", self.path);
        if let Err(e) = self.runtime.remove_file(&self.path) {
            warn!("Failed to remove scratch file {:?}: {}", self.path, e);
        }
    }
}
