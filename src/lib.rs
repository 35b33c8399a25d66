//! # ESR Branches Library
//!
//! This library provides the core functionality for declaring an Extended
//! Support Release (ESR) across the balenaOS device repositories. It is used
//! by the `esr-branches` command-line tool but can also be driven directly.
//!
//! ## Quick Example
//!
//! ```
//! use esr_branches::manifest::prepend_changelog;
//! use esr_branches::version::{EsrVersion, PlatformVersion};
//!
//! let esr = EsrVersion::parse("2020.07.1").unwrap();
//! assert_eq!(esr.stamp(), "2020.07");
//! assert_eq!(esr.device_branch().unwrap(), "2020.07.x");
//!
//! let platform = PlatformVersion::parse("2.68").unwrap();
//! assert_eq!(platform.metadata_branch(), "2.68.x");
//!
//! let changelog = prepend_changelog("# v2.58.3+rev1\n", &esr);
//! assert!(changelog.starts_with("# 2020.07.1\n"));
//! ```
//!
//! ## Core Concepts
//!
//! - **Versions (`version`)**: Validation of ESR (`YYYY.MM.N`) and platform
//!   (`MAJOR.MINOR`) versions and the branch names derived from them.
//! - **Manifests (`manifest`, `staging`)**: Declaring the ESR in `repo.yml`
//!   files, rewriting `VERSION` and prepending to `CHANGELOG.md`. Device file
//!   edits and the submodule manifest are staged and written all or none.
//! - **Repositories (`repository`, `git`, `workspace`)**: Remote branch
//!   checks, clones, branch checkout, commits and pushes through the system
//!   `git`, inside a scratch workspace.
//! - **Devices (`device_types`, `catalog`)**: Collecting device-type slugs
//!   from each clone and comparing them with the canonical device catalog.
//! - **Orchestration (`orchestrator`)**: The per-repository loop, failure
//!   isolation, reconciliation and the deploy hook (`deploy`).
//!
//! ## Execution Flow
//!
//! 1.  **Check**: Skip repositories whose remote already has the ESR branch.
//! 2.  **Clone**: Clone the repository with its submodules.
//! 3.  **Branch**: Check out the platform branch in the metadata submodule and
//!     the ESR branch in the device repository.
//! 4.  **Declare**: Edit the manifests, `VERSION` and `CHANGELOG.md`.
//! 5.  **Publish**: Commit and push the submodule, then the device repository.
//! 6.  **Reconcile**: Report catalog devices that still lack an ESR branch.

pub mod catalog;
pub mod config;
pub mod defaults;
pub mod deploy;
pub mod device_types;
pub mod error;
pub mod git;
pub mod logging;
pub mod manifest;
pub mod orchestrator;
pub mod repository;
pub mod staging;
pub mod version;
pub mod workspace;
