//! Scratch workspace for repository clones.
//!
//! The workspace is a temporary directory created before the repository loop
//! and removed when the `Workspace` is dropped. When retention is requested
//! the directory is detached from cleanup and its path logged so the clones
//! can be inspected after the run.

use std::path::{Path, PathBuf};

use log::info;
use tempfile::TempDir;

use crate::error::Result;

/// Directory holding this run's clones
#[derive(Debug)]
pub enum Workspace {
    /// Removed on drop.
    Scoped(TempDir),
    /// Left on disk after the run.
    Kept(PathBuf),
}

impl Workspace {
    /// Create a fresh scratch directory.
    pub fn create(keep: bool) -> Result<Self> {
        let dir = tempfile::Builder::new().prefix("esr-branches-").tempdir()?;
        let workspace = if keep {
            let path = dir.keep();
            info!("Keeping workspace {}", path.display());
            Self::Kept(path)
        } else {
            Self::Scoped(dir)
        };
        info!("Working in {}", workspace.path().display());
        Ok(workspace)
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Scoped(dir) => dir.path(),
            Self::Kept(path) => path,
        }
    }
}
