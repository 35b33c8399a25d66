//! Shared test utilities for integration and E2E tests.
//!
//! ## Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! let fixture = DeviceFixture::new().with_device_repository();
//! ```

use assert_fs::prelude::*;
use std::path::Path;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::files;
    pub use super::DeviceFixture;
}

/// Initial contents of a device repository's files.
#[allow(dead_code)]
pub mod files {
    pub const DEVICE_MANIFEST: &str = "type: board\nyocto:\n  machine: qemux86-64\n";
    pub const METADATA_MANIFEST: &str = "type: generic\n";
    pub const VERSION: &str = "2.58.3+rev1\n";
    pub const CHANGELOG: &str = "# v2.58.3+rev1\n## (2020-07-01)\n\n* Update meta-balena\n";
    pub const SUBMODULE: &str = "layers/meta-balena";
}

/// A temporary directory laid out like a device repository checkout.
pub struct DeviceFixture {
    temp_dir: assert_fs::TempDir,
}

impl DeviceFixture {
    /// Create a fixture with an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Add `repo.yml`, `VERSION`, `CHANGELOG.md` and the metadata submodule manifest.
    pub fn with_device_repository(self) -> Self {
        self.with_file("repo.yml", files::DEVICE_MANIFEST)
            .with_file("VERSION", files::VERSION)
            .with_file("CHANGELOG.md", files::CHANGELOG)
            .with_file(
                &format!("{}/repo.yml", files::SUBMODULE),
                files::METADATA_MANIFEST,
            )
    }

    /// Add a file with the given path and content.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    /// Get the path to the temporary directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Read a file relative to the fixture root.
    #[allow(dead_code)]
    pub fn read(&self, path: &str) -> String {
        std::fs::read_to_string(self.path().join(path)).expect("Failed to read file")
    }

    /// Create a child path in the temp directory.
    #[allow(dead_code)]
    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }
}

impl Default for DeviceFixture {
    fn default() -> Self {
        Self::new()
    }
}
