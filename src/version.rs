//! # ESR and Platform Versions
//!
//! Parsing and validation of the two version identifiers the tool works with,
//! and derivation of the branch names built from them.
//!
//! - **ESR version** (`EsrVersion`): `YYYY.MM.BUILD`, for example `2020.07.1`.
//!   Its stamp `YYYY.MM` is recorded in the device manifest and commit
//!   message; its branch `YYYY.MM.x` names the device repository branch.
//! - **Platform version** (`PlatformVersion`): `MAJOR.MINOR`, for example
//!   `2.68`. Its branch `MAJOR.MINOR.x` names the metadata submodule branch.
//!
//! Months are accepted in the range `01`-`12` only. Branch names are checked
//! again against the branch pattern before they are used.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use log::info;
use regex::Regex;

use crate::error::{Error, Result};

static ESR_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[1-3][0-9]{3}\.(0[1-9]|1[0-2])\.[0-9]$").expect("ESR version pattern is valid")
});

static DEVICE_BRANCH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[1-3][0-9]{3}\.(0[1-9]|1[0-2])\.x$").expect("device branch pattern is valid")
});

static PLATFORM_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9]+\.[0-9]+$").expect("platform version pattern is valid")
});

/// Returns true if `version` is a well-formed ESR version (`YYYY.MM.B`).
pub fn check_esr_version(version: &str) -> bool {
    ESR_VERSION.is_match(version)
}

/// Returns true if `version` is a well-formed platform version (`MAJOR.MINOR`).
pub fn check_platform_version(version: &str) -> bool {
    PLATFORM_VERSION.is_match(version)
}

/// Returns true if `branch` is a well-formed device ESR branch (`YYYY.MM.x`).
pub fn check_device_branch(branch: &str) -> bool {
    if !DEVICE_BRANCH.is_match(branch) {
        info!("Invalid branch pattern {}", branch);
        return false;
    }
    true
}

/// A validated Extended Support Release version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EsrVersion {
    year: String,
    month: String,
    build: String,
}

impl EsrVersion {
    /// Parses and validates an ESR version string.
    pub fn parse(version: &str) -> Result<Self> {
        if !check_esr_version(version) {
            return Err(Error::InvalidVersion {
                kind: "ESR",
                value: version.to_string(),
            });
        }

        let mut parts = version.split('.');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(year), Some(month), Some(build)) => Ok(Self {
                year: year.to_string(),
                month: month.to_string(),
                build: build.to_string(),
            }),
            _ => Err(Error::InvalidVersion {
                kind: "ESR",
                value: version.to_string(),
            }),
        }
    }

    /// The `YYYY.MM` stamp recorded in the device manifest.
    pub fn stamp(&self) -> String {
        format!("{}.{}", self.year, self.month)
    }

    /// The device repository branch, `YYYY.MM.x`.
    ///
    /// The name is re-validated against the branch pattern.
    pub fn device_branch(&self) -> Result<String> {
        let branch = format!("{}.{}.x", self.year, self.month);
        if !check_device_branch(&branch) {
            return Err(Error::InvalidBranch { branch });
        }
        Ok(branch)
    }
}

impl fmt::Display for EsrVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.year, self.month, self.build)
    }
}

impl FromStr for EsrVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// A validated platform (OS) version, `MAJOR.MINOR`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlatformVersion(String);

impl PlatformVersion {
    /// Parses and validates a platform version string.
    pub fn parse(version: &str) -> Result<Self> {
        if !check_platform_version(version) {
            return Err(Error::InvalidVersion {
                kind: "platform",
                value: version.to_string(),
            });
        }
        Ok(Self(version.to_string()))
    }

    /// The version as written, e.g. `2.68`.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The metadata submodule branch, `MAJOR.MINOR.x`.
    pub fn metadata_branch(&self) -> String {
        format!("{}.x", self.0)
    }
}

impl fmt::Display for PlatformVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PlatformVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}


#[cfg(test)]
mod proptest_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: every well-formed version is accepted and round-trips through Display
        #[test]
        fn esr_version_accepts_well_formed(
            year in 1000u32..4000,
            month in 1u32..=12,
            build in 0u32..10,
        ) {
            let text = format!("{}.{:02}.{}", year, month, build);
            prop_assert!(check_esr_version(&text));
            let esr = EsrVersion::parse(&text).unwrap();
            prop_assert_eq!(esr.to_string(), text);
            prop_assert_eq!(esr.device_branch().unwrap(), format!("{}.{:02}.x", year, month));
        }

        /// Property: months outside 01-12 are always rejected
        #[test]
        fn esr_version_rejects_bad_months(year in 1000u32..4000, month in 13u32..100) {
            let text = format!("{}.{:02}.1", year, month);
            prop_assert!(!check_esr_version(&text));
        }

        /// Property: single-digit months are rejected
        #[test]
        fn esr_version_rejects_unpadded_months(year in 1000u32..4000, month in 1u32..10) {
            let text = format!("{}.{}.1", year, month);
            prop_assert!(!check_esr_version(&text));
        }

        /// Property: any MAJOR.MINOR made of digits is a valid platform version
        #[test]
        fn platform_version_accepts_digit_pairs(major in 0u32..1000, minor in 0u32..1000) {
            let text = format!("{}.{}", major, minor);
            let platform = PlatformVersion::parse(&text).unwrap();
            prop_assert_eq!(platform.metadata_branch(), format!("{}.x", text));
        }
    }
}
