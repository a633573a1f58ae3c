use std::path::{Path, PathBuf};

use crate::error::VerticutResult;

/// A per-request working directory, deleted on drop on every exit path
/// (success, failure, or unwind).
#[derive(Debug)]
pub struct Workspace {
    dir: tempfile::TempDir,
}

impl Workspace {
    pub fn create() -> VerticutResult<Self> {
        use anyhow::Context as _;
        let dir = tempfile::Builder::new()
            .prefix("verticut-")
            .tempdir()
            .context("failed to create working directory")?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path for a file inside the workspace.
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}
