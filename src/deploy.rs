//! Build and deploy hook for devices that gained an ESR branch.
//!
//! Triggering the downstream build jobs belongs to the CI system. This
//! module only defines the collaborator seam; `DisabledDeploy` is the
//! implementation shipped with the tool and triggers nothing.

use log::info;

use crate::error::Result;

/// One build-and-deploy request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildJob {
    /// Device type slug
    pub device: String,
    /// ESR branch to build
    pub branch: String,
    /// Target deploy environment, e.g. `staging`
    pub environment: String,
}

/// Credentials for the build system
#[derive(Clone, Default)]
pub struct Credentials {
    pub user: String,
    pub token: String,
}

impl Credentials {
    /// Read `ESR_DEPLOY_USER` and `ESR_DEPLOY_TOKEN`, defaulting to empty.
    pub fn from_env() -> Self {
        Self {
            user: std::env::var("ESR_DEPLOY_USER").unwrap_or_default(),
            token: std::env::var("ESR_DEPLOY_TOKEN").unwrap_or_default(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// What became of a build request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployStatus {
    Triggered,
    /// No build system is configured.
    Skipped,
}

/// Trigger for downstream build jobs
pub trait DeployTrigger {
    fn trigger(&self, job: &BuildJob, credentials: &Credentials) -> Result<DeployStatus>;
}

/// Deploy hook that records the request and triggers nothing
pub struct DisabledDeploy;

impl DeployTrigger for DisabledDeploy {
    fn trigger(&self, job: &BuildJob, _credentials: &Credentials) -> Result<DeployStatus> {
        info!(
            "Build trigger not configured: skipping {} on {} for {}",
            job.device, job.branch, job.environment
        );
        Ok(DeployStatus::Skipped)
    }
}
