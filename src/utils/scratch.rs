use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::TempDir;

const SCRATCH_PREFIX: &str = "ytgrab-";

/// A per-request working directory, removed from disk when dropped.
#[derive(Debug)]
pub struct ScratchDir {
    dir: TempDir,
}

impl ScratchDir {
    pub fn new_in(root: &Path) -> Result<Self> {
        std::fs::create_dir_all(root)
            .with_context(|| format!("Failed to create scratch root {:?}", root))?;
        let dir = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempdir_in(root)
            .with_context(|| format!("Failed to create scratch directory in {:?}", root))?;
        log::debug!("Created scratch directory {:?}", dir.path());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Creates (if needed) and returns a sub-directory for one item of a batch.
    pub fn item_dir(&self, index: usize) -> Result<PathBuf> {
        let path = self.dir.path().join(format!("item-{}", index));
        std::fs::create_dir_all(&path)
            .with_context(|| format!("Failed to create item directory {:?}", path))?;
        Ok(path)
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        log::debug!("Removing scratch directory {:?}", self.dir.path());
    }
}
