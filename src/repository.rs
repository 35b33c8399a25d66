//! # Device Repositories and Git Access
//!
//! This module holds the two things the orchestrator needs to know about a
//! repository in the fleet: where it lives (`DeviceRepository`) and how to
//! talk to its remote (`GitOperations`).
//!
//! ## Design
//!
//! Git access goes through the `GitOperations` trait so the whole ESR run can
//! be exercised without network access. `DefaultGitOperations` forwards to
//! the system `git` wrappers in `crate::git`; tests substitute recording
//! mocks that simulate clones by writing fixture files.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::git::{BranchOutcome, CommitOutcome, Identity, PushOutcome};

/// Trait for git operations - allows mocking in tests
pub trait GitOperations {
    /// Whether `branch` exists on the remote at `url`.
    fn remote_branch_exists(&self, url: &str, branch: &str) -> Result<bool>;

    /// Clone `url` into `target_dir`, initializing submodules.
    fn clone_with_submodules(&self, url: &str, target_dir: &Path) -> Result<()>;

    /// Check out `branch` in `dir`, tracking `<remote>/<branch>` when it
    /// exists and creating it from HEAD otherwise.
    fn checkout_or_create(&self, dir: &Path, remote: &str, branch: &str) -> Result<BranchOutcome>;

    /// Committer identity configured for `dir`.
    fn user_identity(&self, dir: &Path) -> Result<Option<Identity>>;

    /// Stage everything in `dir` and commit it.
    fn commit_all(&self, dir: &Path, message: &str) -> Result<CommitOutcome>;

    /// Push `branch` from `dir` to `remote`.
    fn push(&self, dir: &Path, remote: &str, branch: &str) -> Result<PushOutcome>;
}

/// The default implementation of `GitOperations`, which uses the system's
/// `git` command to perform real Git operations.
pub struct DefaultGitOperations;

impl GitOperations for DefaultGitOperations {
    fn remote_branch_exists(&self, url: &str, branch: &str) -> Result<bool> {
        crate::git::remote_branch_exists(url, branch)
    }

    fn clone_with_submodules(&self, url: &str, target_dir: &Path) -> Result<()> {
        crate::git::clone_with_submodules(url, target_dir)
    }

    fn checkout_or_create(&self, dir: &Path, remote: &str, branch: &str) -> Result<BranchOutcome> {
        crate::git::checkout_or_create(dir, remote, branch)
    }

    fn user_identity(&self, dir: &Path) -> Result<Option<Identity>> {
        crate::git::user_identity(dir)
    }

    fn commit_all(&self, dir: &Path, message: &str) -> Result<CommitOutcome> {
        crate::git::commit_all(dir, message)
    }

    fn push(&self, dir: &Path, remote: &str, branch: &str) -> Result<PushOutcome> {
        crate::git::push(dir, remote, branch)
    }
}

/// A device repository in the fleet and its local clone location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRepository {
    /// Remote URL, e.g. `git@github.com:balena-os/balena-intel.git`
    pub url: String,
    /// Directory the repository is cloned into
    pub clone_dir: PathBuf,
}

impl DeviceRepository {
    /// Place the clone of `url` under `workspace`, named after the repository.
    pub fn new(url: &str, workspace: &Path) -> Self {
        let url = url.trim();
        Self {
            url: url.to_string(),
            clone_dir: workspace.join(repository_name(url)),
        }
    }

    /// Location of the metadata submodule inside the clone
    pub fn submodule_dir(&self, submodule: &Path) -> PathBuf {
        self.clone_dir.join(submodule)
    }
}

/// Directory name for a repository URL: its last path component without `.git`.
///
/// Handles both `scheme://host/org/name.git` and scp-like `git@host:org/name.git`.
pub fn repository_name(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    let last = trimmed
        .rsplit(['/', ':'])
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or(trimmed);
    last.strip_suffix(".git").unwrap_or(last).to_string()
}
