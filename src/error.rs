//! # Error Handling
//!
//! This module defines the centralized error type for the `esr-branches`
//! library. It uses `thiserror` to describe every failure the ESR run can
//! hit, with enough context (URL, branch, path) to be useful in the run log.
//!
//! ## Key Components
//!
//! - **`Error`**: The main enum that represents all possible errors. Variants
//!   fall into a few groups:
//!   - Validation of version and branch strings.
//!   - Git command execution (clone, checkout, commit, push, ls-remote).
//!   - Device repository preconditions (missing `repo.yml`, `VERSION`,
//!     `CHANGELOG.md`).
//!   - File rewriting (`VERSION` substitution, staged writes).
//!   - The remote device catalog.
//!   - Wrapped I/O, YAML, JSON, regex and HTTP errors.
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for ESR branch operations
#[derive(Error, Debug)]
pub enum Error {
    /// A version string did not match its expected pattern.
    #[error("Invalid {kind} version '{value}'")]
    InvalidVersion { kind: &'static str, value: String },

    /// A derived branch name did not match the branch pattern.
    #[error("Invalid branch pattern '{branch}'")]
    InvalidBranch { branch: String },

    /// An error occurred while cloning a Git repository.
    #[error("Git clone error for {url}: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    GitClone {
        url: String,
        message: String,
        /// Optional hint for how to resolve the clone issue
        hint: Option<String>,
    },

    /// An error occurred while executing a Git command.
    #[error("Git command failed in {location}: {command} - {stderr}")]
    GitCommand {
        command: String,
        /// Remote URL or local directory the command ran against
        location: String,
        stderr: String,
    },

    /// The clone has no committer identity configured.
    #[error("No git identity configured in {}: set user.name and user.email", path.display())]
    GitIdentity { path: PathBuf },

    /// A directory is missing one of the files that mark a device repository.
    #[error("Not a device repository: {} (missing {missing})", path.display())]
    NotDeviceRepository { path: PathBuf, missing: String },

    /// A metadata submodule has no `repo.yml`.
    #[error("Missing repo.yml in {}", path.display())]
    MissingManifest { path: PathBuf },

    /// A `repo.yml` could not be interpreted as a mapping.
    #[error("Malformed manifest {}: {message}", path.display())]
    Manifest { path: PathBuf, message: String },

    /// The `VERSION` file did not contain exactly one version line.
    #[error("Error in VERSION file {}: {message}", path.display())]
    VersionFile { path: PathBuf, message: String },

    /// A staged file could not be committed to disk.
    #[error("Staged write failed for {}: {message}", path.display())]
    Staging { path: PathBuf, message: String },

    /// An error occurred while reading the repository list file.
    #[error("Configuration error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    Config {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// The device catalog could not be fetched or decoded.
    #[error("Device catalog error: {url} - {message}")]
    Catalog { url: String, message: String },

    /// The run log could not be set up.
    #[error("Logging setup error: {message}")]
    Logging { message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A JSON parsing error, wrapped from `serde_json::Error`.
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// A regular expression error, wrapped from `regex::Error`.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// A glob pattern error, wrapped from `glob::PatternError`.
    #[error("Glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),

    /// An HTTP transport error, wrapped from `reqwest::Error`.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
