//! Default values for an ESR run.
//!
//! This module provides centralized default values used by the CLI and the
//! run configuration, ensuring consistency and avoiding duplication.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

/// Device repositories that receive ESR branches unless `--repos-file` is given.
pub const FLEET_REPOSITORIES: &[&str] = &[
    "git@github.com:balena-os/balena-bepmarine.git",
    "git@github.com:balena-os/balena-ts.git",
    "git@github.com:balena-os/balena-raspberrypi.git",
    "git@github.com:balena-os/balena-edison.git",
    "git@github.com:balena-os/balena-fastenal-bbb.git",
    "git@github.com:balena-os/balena-fsl-arm.git",
    "git@github.com:balena-os/balena-intel.git",
    "git@github.com:balena-os/balena-jetson-j120-tx2.git",
    "git@github.com:balena-os/balena-nanopc-t4.git",
    "git@github.com:balena-os/balena-odroid.git",
    "git@github.com:balena-os/balena-beaglebone.git",
    "git@github.com:balena-os/balena-qemu.git",
    "git@github.com:balena-os/balena-up-board.git",
    "git@github.com:balena-os/balena-variscite.git",
    "git@github.com:balena-os/balena-dt-cloudconnector.git",
    "git@github.com:balena-os/balena-allwinner.git",
    "git@github.com:balena-os/balena-jetson.git",
    "git@github.com:balena-os/balena-jetson-skx2.git",
    "git@github.com:balena-os/balena-val100.git",
    "git@github.com:balena-os/balena-alliance-raspberrypi3.git",
    "git@github.com:balena-os/balena-stem-x86-32bit.git",
    "git@github.com:balena-os/balena-technexion.git",
    "git@github.com:balena-os/balena-variscite-mx8.git",
    "git@github.com:balena-os/balena-xilinx.git",
    "git@github.com:balena-os/balena-asus-tinker-board.git",
    "git@github.com:balena-os/balena-compulab.git",
    "git@github.com:balena-os/balena-coral.git",
    "git@github.com:balena-os/balena-rockchip-rk3288.git",
    "git@github.com:balena-os/balena-jetson-srd3.git",
    "git@github.com:balena-os/balena-jetson-wnb.git",
];

/// Remote that branches are checked out from and pushed to
pub const DEFAULT_REMOTE: &str = "origin";

/// Location of the metadata submodule inside a device repository
pub const DEFAULT_SUBMODULE_PATH: &str = "layers/meta-balena";

/// Prefix of the per-run log file
pub const LOG_FILE_PREFIX: &str = "esr-branches";

/// Returns the built-in fleet repository list.
pub fn fleet_repositories() -> Vec<String> {
    FLEET_REPOSITORIES.iter().map(|url| url.to_string()).collect()
}

/// Returns the default metadata submodule path.
pub fn default_submodule_path() -> PathBuf {
    PathBuf::from(DEFAULT_SUBMODULE_PATH)
}

/// Returns the per-run log file name, `esr-branches-<unix seconds>.log`.
pub fn log_file_name() -> String {
    let seconds = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    format!("{}-{}.log", LOG_FILE_PREFIX, seconds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_fleet_repositories_are_unique() {
        let repos = fleet_repositories();
        let unique: HashSet<_> = repos.iter().collect();
        assert_eq!(unique.len(), repos.len());
        assert_eq!(repos.len(), 30);
    }

    #[test]
    fn test_fleet_repositories_are_git_urls() {
        assert!(FLEET_REPOSITORIES
            .iter()
            .all(|url| url.starts_with("git@github.com:") && url.ends_with(".git")));
    }

    #[test]
    fn test_log_file_name() {
        let name = log_file_name();
        assert!(name.starts_with("esr-branches-"));
        assert!(name.ends_with(".log"));
        let stamp = &name["esr-branches-".len()..name.len() - ".log".len()];
        assert!(stamp.parse::<u64>().is_ok());
    }
}
