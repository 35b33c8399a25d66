//! # ESR Run Orchestration
//!
//! This module drives a complete ESR run over the configured repositories.
//!
//! ## Process
//!
//! 1.  **Workspace**: A scratch directory is created for the clones.
//!
//! 2.  **Repository loop**: For each repository URL, in order:
//!     - The remote is asked whether the device branch (`YYYY.MM.x`) already
//!       exists. If it does, the repository is skipped; re-running the tool
//!       never duplicates work.
//!     - The repository is cloned with its submodules and its device-type
//!       slugs are collected.
//!     - The metadata submodule is switched to the platform branch
//!       (`MAJOR.MINOR.x`) and the device repository to the device branch,
//!       creating either branch from HEAD when the remote lacks it.
//!     - The ESR is declared in the submodule manifest and in the device
//!       repository's `repo.yml`, `VERSION` and `CHANGELOG.md`.
//!     - The submodule is committed and pushed, then the device repository.
//!
//!     A failure inside one repository is logged and recorded, and the loop
//!     moves on. Failing to query a remote ends the run.
//!
//! 3.  **Reconciliation**: The canonical device list is compared with the
//!     slugs collected from repositories that were branched successfully.
//!
//! 4.  **Deploy hook**: When a deploy environment is configured, the build
//!     hook is called for every covered device.
//!
//! In local mode (`RunConfig::local_path`), only the file edits of step 2 are
//! applied to an existing checkout.

use std::path::Path;

use log::{error, info, warn};

use crate::catalog::{self, DeviceCatalog, HttpCatalog, Reconciliation};
use crate::config::RunConfig;
use crate::deploy::{BuildJob, Credentials, DeployTrigger, DisabledDeploy};
use crate::device_types;
use crate::error::{Error, Result};
use crate::git::PushOutcome;
use crate::manifest::{self, EsrChanges, ManifestOutcome};
use crate::repository::{DefaultGitOperations, DeviceRepository, GitOperations};
use crate::workspace::Workspace;

/// What happened to one repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoOutcome {
    /// The device branch already existed upstream.
    Skipped,
    /// Branches were checked out, files edited, committed and pushed.
    Branched {
        changes: EsrChanges,
        metadata_push: PushOutcome,
        device_push: PushOutcome,
    },
    /// Local mode: files were edited in place.
    Edited(EsrChanges),
    /// Processing stopped with an error.
    Failed(String),
}

/// Outcome for one repository URL (or local path)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoReport {
    pub repository: String,
    pub outcome: RepoOutcome,
}

/// Everything a run produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub repositories: Vec<RepoReport>,
    /// Device slugs collected from processed repositories
    pub slugs: Vec<String>,
    /// Catalog comparison, when it ran
    pub reconciliation: Option<Reconciliation>,
}

impl RunReport {
    fn count(&self, predicate: impl Fn(&RepoOutcome) -> bool) -> usize {
        self.repositories
            .iter()
            .filter(|report| predicate(&report.outcome))
            .count()
    }

    /// Repositories that ended with an error
    pub fn failures(&self) -> Vec<&RepoReport> {
        self.repositories
            .iter()
            .filter(|report| matches!(report.outcome, RepoOutcome::Failed(_)))
            .collect()
    }

    /// Log a one-line summary of the run.
    pub fn log_summary(&self) {
        let branched = self.count(|o| matches!(o, RepoOutcome::Branched { .. }));
        let edited = self.count(|o| matches!(o, RepoOutcome::Edited(_)));
        let skipped = self.count(|o| matches!(o, RepoOutcome::Skipped));
        let declared = self.count(|o| {
            matches!(
                o,
                RepoOutcome::Branched { changes, .. } | RepoOutcome::Edited(changes)
                    if changes.device == ManifestOutcome::AlreadyDeclared
            )
        });
        let failed = self.failures().len();

        info!(
            "ESR run finished: {} branched, {} edited locally, {} skipped, {} already declared, {} failed",
            branched, edited, skipped, declared, failed
        );
        for report in self.failures() {
            if let RepoOutcome::Failed(reason) = &report.outcome {
                error!("{}: {}", report.repository, reason);
            }
        }
    }
}

/// Runs ESR branch creation against the configured fleet
pub struct Orchestrator {
    git_ops: Box<dyn GitOperations>,
    catalog: Option<Box<dyn DeviceCatalog>>,
    deploy: Box<dyn DeployTrigger>,
}

impl Orchestrator {
    /// Orchestrator using the system `git`, the configured HTTP catalog and
    /// the disabled deploy hook.
    pub fn new(config: &RunConfig) -> Self {
        Self {
            git_ops: Box::new(DefaultGitOperations),
            catalog: config
                .catalog_url
                .as_ref()
                .map(|url| Box::new(HttpCatalog::new(url.as_str())) as Box<dyn DeviceCatalog>),
            deploy: Box::new(DisabledDeploy),
        }
    }

    /// Orchestrator with injected collaborators.
    ///
    /// Used by tests to run without network access.
    pub fn with_operations(
        git_ops: Box<dyn GitOperations>,
        catalog: Option<Box<dyn DeviceCatalog>>,
        deploy: Box<dyn DeployTrigger>,
    ) -> Self {
        Self {
            git_ops,
            catalog,
            deploy,
        }
    }

    /// Execute the run described by `config`.
    pub fn run(&self, config: &RunConfig) -> Result<RunReport> {
        if let Some(path) = &config.local_path {
            return Ok(apply_local(config, path));
        }

        let mut report = {
            let workspace = Workspace::create(config.keep_workspace)?;
            self.create_esr_branches(config, workspace.path())?
        };

        if let Some(catalog) = &self.catalog {
            let reconciliation =
                catalog::reconcile(catalog.as_ref(), &report.slugs, &config.esr.to_string())?;
            if let Some(environment) = &config.deploy_environment {
                self.deploy_covered(config, &reconciliation.covered, environment)?;
            }
            report.reconciliation = Some(reconciliation);
        }

        report.log_summary();
        Ok(report)
    }

    /// Process every configured repository inside `workspace`.
    pub fn create_esr_branches(&self, config: &RunConfig, workspace: &Path) -> Result<RunReport> {
        let device_branch = config.device_branch()?;
        let mut report = RunReport::default();

        for url in &config.repositories {
            let repo = DeviceRepository::new(url, workspace);

            if self.git_ops.remote_branch_exists(&repo.url, &device_branch)? {
                info!("ESR branch {} already exists in {}", device_branch, repo.url);
                report.repositories.push(RepoReport {
                    repository: repo.url,
                    outcome: RepoOutcome::Skipped,
                });
                continue;
            }

            let outcome = match self.branch_repository(config, &repo, &device_branch) {
                Ok((outcome, slugs)) => {
                    report.slugs.extend(slugs);
                    outcome
                }
                Err(e) => {
                    error!("Failed to create ESR branch in {}: {}", repo.url, e);
                    RepoOutcome::Failed(e.to_string())
                }
            };
            report.repositories.push(RepoReport {
                repository: repo.url,
                outcome,
            });
        }

        Ok(report)
    }

    fn branch_repository(
        &self,
        config: &RunConfig,
        repo: &DeviceRepository,
        device_branch: &str,
    ) -> Result<(RepoOutcome, Vec<String>)> {
        self.git_ops.clone_with_submodules(&repo.url, &repo.clone_dir)?;
        // counted as covered only once the branch work below succeeds
        let slugs = device_types::collect_slugs(&repo.clone_dir)?;

        let submodule_dir = repo.submodule_dir(&config.submodule);
        manifest::metadata_manifest(&submodule_dir)?;

        let metadata_branch = config.metadata_branch();
        self.git_ops
            .checkout_or_create(&submodule_dir, &config.remote, &metadata_branch)?;
        self.git_ops
            .checkout_or_create(&repo.clone_dir, &config.remote, device_branch)?;

        let changes = manifest::apply_esr_changes(
            &repo.clone_dir,
            &config.submodule,
            &config.platform,
            &config.esr,
        )?;

        if self.git_ops.user_identity(&repo.clone_dir)?.is_none() {
            return Err(Error::GitIdentity {
                path: repo.clone_dir.clone(),
            });
        }

        let metadata_message = format!("Declare ESR {}", config.platform);
        self.git_ops.commit_all(&submodule_dir, &metadata_message)?;
        let metadata_push = self.push(config, &submodule_dir, &metadata_branch)?;

        let device_message = format!("Declare ESR {}", config.esr.stamp());
        self.git_ops.commit_all(&repo.clone_dir, &device_message)?;
        let device_push = self.push(config, &repo.clone_dir, device_branch)?;

        let outcome = RepoOutcome::Branched {
            changes,
            metadata_push,
            device_push,
        };
        Ok((outcome, slugs))
    }

    fn push(&self, config: &RunConfig, dir: &Path, branch: &str) -> Result<PushOutcome> {
        if config.dry_run {
            info!("Dry run: not pushing {} from {}", branch, dir.display());
            return Ok(PushOutcome::Skipped);
        }
        self.git_ops.push(dir, &config.remote, branch)
    }

    fn deploy_covered(&self, config: &RunConfig, devices: &[String], environment: &str) -> Result<()> {
        let branch = config.device_branch()?;
        let credentials = Credentials::from_env();

        for device in devices {
            let job = BuildJob {
                device: device.clone(),
                branch: branch.clone(),
                environment: environment.to_string(),
            };
            if let Err(e) = self.deploy.trigger(&job, &credentials) {
                warn!("Build trigger failed for {}: {}", device, e);
            }
        }
        Ok(())
    }
}

/// Apply the ESR file edits to an existing local checkout.
pub fn apply_local(config: &RunConfig, path: &Path) -> RunReport {
    info!("Applying ESR {} to local checkout {}", config.esr, path.display());

    let outcome = match manifest::apply_esr_changes(path, &config.submodule, &config.platform, &config.esr) {
        Ok(changes) => RepoOutcome::Edited(changes),
        Err(e) => {
            error!("{}", e);
            RepoOutcome::Failed(e.to_string())
        }
    };

    let report = RunReport {
        repositories: vec![RepoReport {
            repository: path.display().to_string(),
            outcome,
        }],
        ..RunReport::default()
    };
    report.log_summary();
    report
}
