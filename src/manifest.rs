//! # Release Metadata Files
//!
//! This module rewrites the three tracked files that declare an ESR in a
//! device repository, and the manifest of its metadata submodule:
//!
//! - **`repo.yml`**: gains a top-level `esr` mapping. The metadata submodule
//!   declares the platform policy (`version`, `bsp-branch-pattern`); the
//!   device repository declares its own stamp (`version`). A manifest that
//!   already carries `esr` is never rewritten.
//! - **`VERSION`**: its single `MAJOR.MINOR.BUILD+revN` line is replaced by
//!   the ESR version.
//! - **`CHANGELOG.md`**: a heading block for the ESR is prepended.
//!
//! All four edits are computed in memory first and written through one
//! `Changeset`, so a malformed `VERSION` leaves both manifests and the
//! changelog untouched as well.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use log::{info, warn};
use regex::Regex;
use serde_yaml::{Mapping, Value as YamlValue};

use crate::error::{Error, Result};
use crate::staging::Changeset;
use crate::version::{EsrVersion, PlatformVersion};

/// Release manifest file name
pub const MANIFEST_FILE: &str = "repo.yml";
/// Plain-text version file name
pub const VERSION_FILE: &str = "VERSION";
/// Changelog file name
pub const CHANGELOG_FILE: &str = "CHANGELOG.md";

/// Top-level manifest key holding the ESR declaration
const ESR_KEY: &str = "esr";

static VERSION_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d+\.\d+\.\d+\+rev\d+$").expect("VERSION line pattern is valid")
});

/// Result of declaring an ESR in a manifest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestOutcome {
    /// The `esr` key was added and the file rewritten.
    Declared,
    /// The manifest already had an `esr` key; nothing was written.
    AlreadyDeclared,
}

/// The `esr` mapping to inject into a manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EsrDeclaration {
    /// Platform policy, declared in the metadata submodule.
    Metadata {
        platform: String,
        branch_pattern: String,
    },
    /// Device stamp, declared in the device repository.
    Device { stamp: String },
}

impl EsrDeclaration {
    /// Declaration for the metadata submodule manifest
    pub fn metadata(platform: &PlatformVersion, esr: &EsrVersion) -> Result<Self> {
        Ok(Self::Metadata {
            platform: platform.as_str().to_string(),
            branch_pattern: esr.device_branch()?,
        })
    }

    /// Declaration for the device repository manifest
    pub fn device(esr: &EsrVersion) -> Self {
        Self::Device { stamp: esr.stamp() }
    }

    fn to_yaml(&self) -> YamlValue {
        let mut map = Mapping::new();
        match self {
            Self::Metadata {
                platform,
                branch_pattern,
            } => {
                map.insert("version".into(), platform.as_str().into());
                map.insert("bsp-branch-pattern".into(), branch_pattern.as_str().into());
            }
            Self::Device { stamp } => {
                map.insert("version".into(), stamp.as_str().into());
            }
        }
        YamlValue::Mapping(map)
    }
}

/// Summary of the edits made to one device repository
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EsrChanges {
    pub metadata: ManifestOutcome,
    pub device: ManifestOutcome,
}

/// Compute the new manifest text with `declaration` added.
///
/// Returns `None` when the manifest already declares an ESR.
pub fn plan_manifest(
    path: &Path,
    contents: &str,
    declaration: &EsrDeclaration,
) -> Result<Option<String>> {
    let mut document: YamlValue = serde_yaml::from_str(contents)?;
    if document.is_null() {
        document = YamlValue::Mapping(Mapping::new());
    }

    let map = document.as_mapping_mut().ok_or_else(|| Error::Manifest {
        path: path.to_path_buf(),
        message: "top level is not a mapping".to_string(),
    })?;

    if map.contains_key(ESR_KEY) {
        return Ok(None);
    }

    map.insert(ESR_KEY.into(), declaration.to_yaml());
    Ok(Some(serde_yaml::to_string(&document)?))
}

/// Replace the version line of a `VERSION` file with the ESR version.
///
/// The whole file, ignoring one trailing newline, must be a single
/// `MAJOR.MINOR.BUILD+revN` line.
pub fn rewrite_version_file(path: &Path, contents: &str, esr: &EsrVersion) -> Result<String> {
    let (body, newline) = match contents.strip_suffix('\n') {
        Some(body) => (body, "\n"),
        None => (contents, ""),
    };

    let count = VERSION_LINE.find_iter(body).count();
    if count != 1 {
        return Err(Error::VersionFile {
            path: path.to_path_buf(),
            message: format!("expected exactly one version line, found {}", count),
        });
    }

    Ok(format!("{}{}", esr, newline))
}

/// Prepend the ESR heading block to a changelog.
///
/// Applying it twice stacks two blocks.
pub fn prepend_changelog(contents: &str, esr: &EsrVersion) -> String {
    format!(
        "# {esr}\n## ({esr})\n\nDeclare ESR {esr}\n\n{contents}",
        esr = esr,
        contents = contents
    )
}

/// Fail unless `repo_dir` holds `repo.yml`, `VERSION` and `CHANGELOG.md`.
pub fn ensure_device_repository(repo_dir: &Path) -> Result<()> {
    for marker in [VERSION_FILE, CHANGELOG_FILE, MANIFEST_FILE] {
        if !repo_dir.join(marker).is_file() {
            return Err(Error::NotDeviceRepository {
                path: repo_dir.to_path_buf(),
                missing: marker.to_string(),
            });
        }
    }
    Ok(())
}

/// Path of the metadata submodule manifest, failing if it is absent.
pub fn metadata_manifest(submodule_dir: &Path) -> Result<PathBuf> {
    let path = submodule_dir.join(MANIFEST_FILE);
    if !path.is_file() {
        return Err(Error::MissingManifest {
            path: submodule_dir.to_path_buf(),
        });
    }
    Ok(path)
}

/// Stage the device repository edits into `changes` without writing them.
fn stage_device_changes(
    repo_dir: &Path,
    esr: &EsrVersion,
    changes: &mut Changeset,
) -> Result<ManifestOutcome> {
    let manifest_path = repo_dir.join(MANIFEST_FILE);
    let manifest = fs::read_to_string(&manifest_path)?;
    let Some(manifest) = plan_manifest(&manifest_path, &manifest, &EsrDeclaration::device(esr))?
    else {
        return Ok(ManifestOutcome::AlreadyDeclared);
    };

    let version_path = repo_dir.join(VERSION_FILE);
    let version = rewrite_version_file(&version_path, &fs::read_to_string(&version_path)?, esr)?;

    let changelog_path = repo_dir.join(CHANGELOG_FILE);
    let changelog = prepend_changelog(&fs::read_to_string(&changelog_path)?, esr);

    changes.stage(manifest_path, manifest);
    changes.stage(version_path, version);
    changes.stage(changelog_path, changelog);
    Ok(ManifestOutcome::Declared)
}

/// Declare the ESR in the metadata submodule and in the device repository.
///
/// `submodule` is relative to `repo_dir`. All four files are written
/// together, or none of them when any edit fails.
pub fn apply_esr_changes(
    repo_dir: &Path,
    submodule: &Path,
    platform: &PlatformVersion,
    esr: &EsrVersion,
) -> Result<EsrChanges> {
    ensure_device_repository(repo_dir)?;

    let metadata_path = metadata_manifest(&repo_dir.join(submodule))?;
    let mut changes = Changeset::new();

    let declaration = EsrDeclaration::metadata(platform, esr)?;
    let metadata = match plan_manifest(
        &metadata_path,
        &fs::read_to_string(&metadata_path)?,
        &declaration,
    )? {
        Some(updated) => {
            changes.stage(&metadata_path, updated);
            ManifestOutcome::Declared
        }
        None => {
            info!("Platform ESR already declared in {}", metadata_path.display());
            ManifestOutcome::AlreadyDeclared
        }
    };

    let device = stage_device_changes(repo_dir, esr, &mut changes)?;
    if device == ManifestOutcome::AlreadyDeclared {
        warn!("ESR version already defined in {}", repo_dir.display());
    }

    changes.commit()?;
    Ok(EsrChanges { metadata, device })
}
