//! # Run Configuration
//!
//! This module defines `RunConfig`, the immutable description of one ESR run,
//! and the parser for repository list files.
//!
//! ## Repository list files
//!
//! A repository list replaces the built-in fleet list. Two layouts are
//! accepted:
//!
//! 1.  **Plain sequence**:
//!
//!     ```yaml
//!     - git@github.com:balena-os/balena-intel.git
//!     - git@github.com:balena-os/balena-qemu.git
//!     ```
//!
//! 2.  **Mapping** with a `repositories` key, which leaves room for comments
//!     and future settings:
//!
//!     ```yaml
//!     repositories:
//!       - git@github.com:balena-os/balena-intel.git
//!     ```
//!
//! The parser tries the plain sequence first and falls back to the mapping.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::catalog::DEFAULT_CATALOG_URL;
use crate::defaults;
use crate::error::{Error, Result};
use crate::version::{EsrVersion, PlatformVersion};

#[derive(Debug, Deserialize)]
struct RepositoryListFile {
    repositories: Vec<String>,
}

/// Parse a repository list from YAML text.
pub fn parse_repository_list(yaml_content: &str) -> Result<Vec<String>> {
    let urls = match serde_yaml::from_str::<Vec<String>>(yaml_content) {
        Ok(urls) => urls,
        Err(_) => {
            serde_yaml::from_str::<RepositoryListFile>(yaml_content)
                .map_err(|e| Error::Config {
                    message: format!("invalid repository list: {}", e),
                    hint: Some(
                        "Use a YAML list of URLs, or a mapping with a 'repositories' list"
                            .to_string(),
                    ),
                })?
                .repositories
        }
    };

    let urls: Vec<String> = urls
        .into_iter()
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
        .collect();

    if urls.is_empty() {
        return Err(Error::Config {
            message: "repository list is empty".to_string(),
            hint: Some("List at least one repository URL".to_string()),
        });
    }

    Ok(urls)
}

/// Read a repository list file.
pub fn repository_list_from_file<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    parse_repository_list(&content)
}

/// Everything one ESR run needs, resolved once at startup
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// ESR being declared
    pub esr: EsrVersion,
    /// Platform version whose metadata branch carries the ESR policy
    pub platform: PlatformVersion,
    /// Local checkout to edit in place instead of processing the fleet
    pub local_path: Option<PathBuf>,
    /// Keep the scratch workspace after the run
    pub keep_workspace: bool,
    /// Repository URLs to process, in order
    pub repositories: Vec<String>,
    /// Remote to track and push to
    pub remote: String,
    /// Metadata submodule path, relative to each device repository
    pub submodule: PathBuf,
    /// Catalog endpoint, or `None` to skip reconciliation
    pub catalog_url: Option<String>,
    /// Commit locally but never push
    pub dry_run: bool,
    /// Deploy environment handed to the build hook, if any
    pub deploy_environment: Option<String>,
}

impl RunConfig {
    /// Configuration for the built-in fleet with default settings.
    pub fn new(esr: EsrVersion, platform: PlatformVersion) -> Self {
        Self {
            esr,
            platform,
            local_path: None,
            keep_workspace: false,
            repositories: defaults::fleet_repositories(),
            remote: defaults::DEFAULT_REMOTE.to_string(),
            submodule: defaults::default_submodule_path(),
            catalog_url: Some(DEFAULT_CATALOG_URL.to_string()),
            dry_run: false,
            deploy_environment: None,
        }
    }

    /// The device branch, `YYYY.MM.x`.
    pub fn device_branch(&self) -> Result<String> {
        self.esr.device_branch()
    }

    /// The metadata submodule branch, `MAJOR.MINOR.x`.
    pub fn metadata_branch(&self) -> String {
        self.platform.metadata_branch()
    }
}
