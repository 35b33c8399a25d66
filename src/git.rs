//! Thin wrappers around the system `git` command.
//!
//! Every function takes the directory it operates on explicitly and runs
//! `git` with that as its working directory; the process-wide current
//! directory is never changed. Using the system `git` picks up whatever SSH
//! keys, credential helpers and `~/.gitconfig` settings the user has.

use std::ffi::OsStr;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use log::{debug, info, warn};

use crate::error::{Error, Result};

/// Trailer appended to every ESR commit message
pub const CHANGE_TYPE_TRAILER: &str = "Change-type: none";

/// How a branch ended up checked out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchOutcome {
    /// A local branch now tracks the existing remote branch.
    Tracking,
    /// The branch did not exist remotely and was created from HEAD.
    Created,
}

/// Result of committing the working tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed,
    NothingToCommit,
}

/// Result of pushing a branch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Pushed,
    /// The remote refused the push, or it failed in transit.
    Rejected,
    /// Dry run; nothing was sent.
    Skipped,
}

/// Committer identity read from git configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

fn git<I, S>(dir: Option<&Path>, args: I) -> std::io::Result<Output>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut command = Command::new("git");
    command.args(args);
    if let Some(dir) = dir {
        command.current_dir(dir);
    }
    command.output()
}

fn command_error(command: &str, location: &str, stderr: impl Into<String>) -> Error {
    Error::GitCommand {
        command: command.to_string(),
        location: location.to_string(),
        stderr: stderr.into(),
    }
}

/// Run `git` in `dir` and fail on a non-zero exit status.
fn git_checked(dir: &Path, args: &[&str]) -> Result<String> {
    let location = dir.display().to_string();
    let command = args.join(" ");
    let output = git(Some(dir), args).map_err(|e| command_error(&command, &location, e.to_string()))?;

    if !output.status.success() {
        return Err(command_error(
            &command,
            &location,
            String::from_utf8_lossy(&output.stderr).trim(),
        ));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Check whether `branch` exists among the heads of the remote at `url`.
pub fn remote_branch_exists(url: &str, branch: &str) -> Result<bool> {
    let output = git(None, ["ls-remote", "--heads", url, branch])
        .map_err(|e| command_error("ls-remote --heads", url, e.to_string()))?;

    if !output.status.success() {
        return Err(command_error(
            "ls-remote --heads",
            url,
            String::from_utf8_lossy(&output.stderr).trim(),
        ));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    if stdout.trim().is_empty() {
        debug!("No ls-remote match for {} in {}", branch, url);
        return Ok(false);
    }

    // Output format: <hash>\t<ref>
    let wanted = format!("refs/heads/{}", branch);
    Ok(stdout
        .lines()
        .filter_map(|line| line.split('\t').nth(1))
        .any(|reference| reference == wanted))
}

/// Clone `url` into `target_dir` and initialize its submodules recursively.
pub fn clone_with_submodules(url: &str, target_dir: &Path) -> Result<()> {
    // git won't clone into an existing non-empty directory
    if target_dir.exists() {
        fs::remove_dir_all(target_dir)?;
    }
    if let Some(parent) = target_dir.parent() {
        fs::create_dir_all(parent)?;
    }

    info!("Cloning {} into {}", url, target_dir.display());
    let mut args = vec![OsStr::new("clone"), OsStr::new(url)];
    args.push(target_dir.as_os_str());
    let output = git(None, args).map_err(|e| Error::GitClone {
        url: url.to_string(),
        message: e.to_string(),
        hint: None,
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);

        let hint = if stderr.contains("Authentication failed")
            || stderr.contains("Permission denied")
            || stderr.contains("Could not read from remote repository")
        {
            Some(
                "Make sure your SSH key is loaded in ssh-agent and has push access to the repository"
                    .to_string(),
            )
        } else {
            None
        };

        return Err(Error::GitClone {
            url: url.to_string(),
            message: stderr.trim().to_string(),
            hint,
        });
    }

    git_checked(target_dir, &["submodule", "update", "--init", "--recursive"])?;
    Ok(())
}

/// Check out `branch` tracking `<remote>/<branch>`, or create it from HEAD.
pub fn checkout_or_create(dir: &Path, remote: &str, branch: &str) -> Result<BranchOutcome> {
    info!("Checking out {} in {}", branch, dir.display());
    let upstream = format!("{}/{}", remote, branch);
    match git_checked(dir, &["checkout", "-b", branch, &upstream]) {
        Ok(_) => Ok(BranchOutcome::Tracking),
        Err(e) => {
            debug!("{}", e);
            info!("Branching {} in {}", branch, dir.display());
            git_checked(dir, &["checkout", "-b", branch])?;
            Ok(BranchOutcome::Created)
        }
    }
}

fn config_value(dir: &Path, key: &str) -> Result<Option<String>> {
    let output = git(Some(dir), ["config", "--get", key])
        .map_err(|e| command_error("config --get", &dir.display().to_string(), e.to_string()))?;

    // `git config --get` exits 1 when the key is unset
    if !output.status.success() {
        return Ok(None);
    }
    let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
    Ok((!value.is_empty()).then_some(value))
}

/// Committer identity configured for the repository at `dir`, if complete.
pub fn user_identity(dir: &Path) -> Result<Option<Identity>> {
    let name = config_value(dir, "user.name")?;
    let email = config_value(dir, "user.email")?;
    Ok(name
        .zip(email)
        .map(|(name, email)| Identity { name, email }))
}

/// Stage the whole working tree and commit it with the ESR trailer.
pub fn commit_all(dir: &Path, message: &str) -> Result<CommitOutcome> {
    git_checked(dir, &["add", "."])?;

    info!("Committing {} in {}", message, dir.display());
    let location = dir.display().to_string();
    let output = git(
        Some(dir),
        ["commit", "-m", message, "-m", CHANGE_TYPE_TRAILER],
    )
    .map_err(|e| command_error("commit", &location, e.to_string()))?;

    if output.status.success() {
        return Ok(CommitOutcome::Committed);
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    if stdout.contains("nothing to commit") || stdout.contains("nothing added to commit") {
        info!("Commit did not happen in {} - already up to date.", location);
        debug!("{}", stdout.trim());
        return Ok(CommitOutcome::NothingToCommit);
    }

    Err(command_error("commit", &location, stderr.trim()))
}

/// Push `branch` to `remote`. A refused push is reported, not raised.
pub fn push(dir: &Path, remote: &str, branch: &str) -> Result<PushOutcome> {
    info!("Pushing {} to {}", branch, remote);
    let location = dir.display().to_string();
    let output = git(Some(dir), ["push", remote, branch])
        .map_err(|e| command_error("push", &location, e.to_string()))?;

    if !output.status.success() {
        warn!("Did not push {} - maybe exists already?", branch);
        debug!("{}", String::from_utf8_lossy(&output.stderr).trim());
        return Ok(PushOutcome::Rejected);
    }

    Ok(PushOutcome::Pushed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_git_checked_reports_failure_location() {
        let temp_dir = TempDir::new().unwrap();
        // Not a repository, so rev-parse fails
        let result = git_checked(temp_dir.path(), &["rev-parse", "HEAD"]);
        match result {
            Err(Error::GitCommand {
                command, location, ..
            }) => {
                assert_eq!(command, "rev-parse HEAD");
                assert_eq!(location, temp_dir.path().display().to_string());
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_remote_branch_exists_errors_for_missing_remote() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nowhere.git");
        let result = remote_branch_exists(&missing.display().to_string(), "2020.07.x");
        assert!(matches!(result, Err(Error::GitCommand { .. })));
    }

    #[test]
    fn test_clone_error_for_missing_remote() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nowhere.git");
        let result = clone_with_submodules(
            &missing.display().to_string(),
            &temp_dir.path().join("clone"),
        );
        assert!(matches!(result, Err(Error::GitClone { .. })));
    }

    // Round trips against real repositories live in tests/fleet_git.rs
}
