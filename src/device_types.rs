//! Device-type slugs from a device repository's build artifacts.
//!
//! Device repositories describe their boards in `*.json` files at the
//! repository root, generated by a helper script from the bundled build
//! scripts. The slugs found there are what the post-run catalog check
//! compares against.

use std::fs;
use std::path::Path;
use std::process::Command;

use glob::{glob, Pattern};
use log::{debug, warn};
use serde::Deserialize;

use crate::error::{Error, Result};

/// Script that regenerates the device-type JSON files, relative to the repo root
pub const DEVICE_TYPE_SCRIPT: &str = "balena-yocto-scripts/build/build-device-type-json.sh";

#[derive(Debug, Deserialize)]
struct DeviceType {
    slug: Option<String>,
}

/// Run the device-type generator if the repository ships it.
///
/// A missing or failing script is logged and otherwise ignored; whatever JSON
/// files are already present are still read.
pub fn generate_device_types(repo_dir: &Path) {
    let script = repo_dir.join(DEVICE_TYPE_SCRIPT);
    if !script.is_file() {
        debug!("No device-type generator in {}", repo_dir.display());
        return;
    }

    match Command::new(&script).current_dir(repo_dir).output() {
        Ok(output) if output.status.success() => {
            debug!("Generated device types in {}", repo_dir.display());
        }
        Ok(output) => warn!(
            "Device-type generator failed in {}: {}",
            repo_dir.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        ),
        Err(e) => warn!(
            "Could not run device-type generator in {}: {}",
            repo_dir.display(),
            e
        ),
    }
}

/// Slugs declared by the `*.json` files at the root of `repo_dir`, sorted.
pub fn read_slugs(repo_dir: &Path) -> Result<Vec<String>> {
    let dir = repo_dir.to_str().ok_or_else(|| Error::Config {
        message: format!("non UTF-8 repository path {}", repo_dir.display()),
        hint: None,
    })?;
    let pattern = format!("{}/*.json", Pattern::escape(dir));

    let mut slugs = Vec::new();
    for entry in glob(&pattern)? {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                warn!("Skipping unreadable device-type file: {}", e);
                continue;
            }
        };

        let device: DeviceType = match serde_json::from_str(&fs::read_to_string(&path)?) {
            Ok(device) => device,
            Err(e) => {
                warn!("Skipping malformed device-type file {}: {}", path.display(), e);
                continue;
            }
        };

        match device.slug {
            Some(slug) => slugs.push(slug),
            None => debug!("No slug in {}", path.display()),
        }
    }

    slugs.sort();
    Ok(slugs)
}

/// Generate the device-type files for `repo_dir` and collect their slugs.
pub fn collect_slugs(repo_dir: &Path) -> Result<Vec<String>> {
    generate_device_types(repo_dir);
    read_slugs(repo_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_slugs() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        fs::write(dir.join("raspberrypi3.json"), r#"{"slug": "raspberrypi3", "arch": "armv7hf"}"#)
            .unwrap();
        fs::write(dir.join("raspberrypi4-64.json"), r#"{"slug": "raspberrypi4-64"}"#).unwrap();
        fs::write(dir.join("README.md"), "not json").unwrap();

        let slugs = read_slugs(dir).unwrap();
        assert_eq!(slugs, vec!["raspberrypi3", "raspberrypi4-64"]);
    }

    #[test]
    fn test_read_slugs_skips_malformed_and_slugless_files() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        fs::write(dir.join("broken.json"), "{").unwrap();
        fs::write(dir.join("package.json"), r#"{"name": "tooling"}"#).unwrap();
        fs::write(dir.join("intel-nuc.json"), r#"{"slug": "intel-nuc"}"#).unwrap();

        assert_eq!(read_slugs(dir).unwrap(), vec!["intel-nuc"]);
    }

    #[test]
    fn test_read_slugs_ignores_nested_files() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        fs::create_dir_all(dir.join("layers")).unwrap();
        fs::write(dir.join("layers/qemux86.json"), r#"{"slug": "qemux86"}"#).unwrap();

        assert!(read_slugs(dir).unwrap().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_collect_slugs_runs_generator() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        let script = dir.join(DEVICE_TYPE_SCRIPT);
        fs::create_dir_all(script.parent().unwrap()).unwrap();
        fs::write(
            &script,
            "#!/bin/sh\necho '{\"slug\": \"generic-amd64\"}' > generic-amd64.json\n",
        )
        .unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        assert_eq!(collect_slugs(dir).unwrap(), vec!["generic-amd64"]);
    }

    #[test]
    fn test_collect_slugs_without_generator() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("coral-dev.json"), r#"{"slug": "coral-dev"}"#).unwrap();
        assert_eq!(collect_slugs(temp_dir.path()).unwrap(), vec!["coral-dev"]);
    }
}
