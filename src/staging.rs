//! Staged multi-file writes
//!
//! A `Changeset` collects the new contents of several files in memory and
//! writes them in two steps: every file is first written to a temporary file
//! in its own directory, and only once all of them are written are the
//! temporaries renamed over their targets. A failure while preparing any file
//! leaves every target untouched.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::debug;
use tempfile::NamedTempFile;

use crate::error::{Error, Result};

/// In-memory set of pending file contents, keyed by absolute target path
#[derive(Debug, Clone, Default)]
pub struct Changeset {
    files: BTreeMap<PathBuf, String>,
}

impl Changeset {
    /// Create an empty changeset
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage new content for `path`, replacing anything staged earlier
    pub fn stage<P: AsRef<Path>>(&mut self, path: P, content: String) {
        self.files.insert(path.as_ref().to_path_buf(), content);
    }

    /// Write every staged file to disk, or none of them.
    ///
    /// Returns the list of written paths in sorted order.
    pub fn commit(self) -> Result<Vec<PathBuf>> {
        let mut prepared = Vec::with_capacity(self.files.len());

        for (path, content) in self.files {
            let parent = path.parent().ok_or_else(|| Error::Staging {
                path: path.clone(),
                message: "target has no parent directory".to_string(),
            })?;

            let mut temp = NamedTempFile::new_in(parent).map_err(|e| Error::Staging {
                path: path.clone(),
                message: e.to_string(),
            })?;
            temp.write_all(content.as_bytes())
                .and_then(|_| temp.flush())
                .map_err(|e| Error::Staging {
                    path: path.clone(),
                    message: e.to_string(),
                })?;

            // temp files are created 0600; keep the target's mode
            if let Ok(metadata) = std::fs::metadata(&path) {
                temp.as_file()
                    .set_permissions(metadata.permissions())
                    .map_err(|e| Error::Staging {
                        path: path.clone(),
                        message: e.to_string(),
                    })?;
            }

            prepared.push((path, temp));
        }

        let mut written = Vec::with_capacity(prepared.len());
        for (path, temp) in prepared {
            temp.persist(&path).map_err(|e| Error::Staging {
                path: path.clone(),
                message: e.error.to_string(),
            })?;
            debug!("Wrote {}", path.display());
            written.push(path);
        }

        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_commit_writes_all_files() {
        let temp_dir = TempDir::new().unwrap();
        let a = temp_dir.path().join("VERSION");
        let b = temp_dir.path().join("CHANGELOG.md");
        fs::write(&a, "1.2.3+rev4\n").unwrap();
        fs::write(&b, "old\n").unwrap();

        let mut changes = Changeset::new();
        changes.stage(&a, "2020.07.1\n".to_string());
        changes.stage(&b, "# 2020.07.1\nold\n".to_string());

        let written = changes.commit().unwrap();
        assert_eq!(written.len(), 2);
        assert_eq!(fs::read_to_string(&a).unwrap(), "2020.07.1\n");
        assert_eq!(fs::read_to_string(&b).unwrap(), "# 2020.07.1\nold\n");
    }

    #[test]
    fn test_commit_writes_nothing_when_a_target_directory_is_missing() {
        let temp_dir = TempDir::new().unwrap();
        let good = temp_dir.path().join("VERSION");
        fs::write(&good, "1.2.3+rev4\n").unwrap();
        let bad = temp_dir.path().join("missing-dir").join("CHANGELOG.md");

        let mut changes = Changeset::new();
        changes.stage(&good, "2020.07.1\n".to_string());
        changes.stage(&bad, "never written".to_string());

        let result = changes.commit();
        assert!(matches!(result, Err(Error::Staging { .. })));
        assert_eq!(fs::read_to_string(&good).unwrap(), "1.2.3+rev4\n");
        assert!(!bad.exists());
    }

    #[test]
    fn test_stage_replaces_earlier_content() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("VERSION");

        let mut changes = Changeset::new();
        changes.stage(&path, "first".to_string());
        changes.stage(&path, "second".to_string());

        assert_eq!(changes.commit().unwrap(), vec![path.clone()]);
        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
    }

    #[test]
    fn test_empty_commit() {
        assert!(Changeset::new().commit().unwrap().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_commit_keeps_target_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("CHANGELOG.md");
        fs::write(&path, "old\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        let mut changes = Changeset::new();
        changes.stage(&path, "new\n".to_string());
        changes.commit().unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }
}
