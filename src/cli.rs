//! CLI argument parsing and run dispatch

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use esr_branches::catalog::DEFAULT_CATALOG_URL;
use esr_branches::config::{self, RunConfig};
use esr_branches::defaults::{DEFAULT_REMOTE, DEFAULT_SUBMODULE_PATH};
use esr_branches::logging;
use esr_branches::orchestrator::{Orchestrator, RunReport};
use esr_branches::version::{EsrVersion, PlatformVersion};

/// Create ESR branches across the balenaOS device repositories
#[derive(Parser, Debug)]
#[command(name = "esr-branches")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// ESR version to declare, e.g. 2020.07.1
    #[arg(short = 'e', long = "esr-version", value_name = "VERSION", value_parser = parse_esr)]
    esr_version: EsrVersion,

    /// balenaOS platform version carrying the ESR policy, e.g. 2.68
    #[arg(short = 'b', long = "bos-version", value_name = "VERSION", value_parser = parse_platform)]
    bos_version: PlatformVersion,

    /// Edit this local device repository checkout in place
    #[arg(short, long, value_name = "DIR")]
    path: Option<PathBuf>,

    /// Keep the scratch directory holding the clones
    #[arg(short = 'k', long = "keep-tmp-dir")]
    keep_tmp_dir: bool,

    /// YAML file listing repository URLs to process instead of the built-in fleet
    #[arg(long, value_name = "FILE")]
    repos_file: Option<PathBuf>,

    /// Remote to track and push to
    #[arg(long, value_name = "NAME", default_value = DEFAULT_REMOTE)]
    remote: String,

    /// Metadata submodule path inside each device repository
    #[arg(long, value_name = "PATH", default_value = DEFAULT_SUBMODULE_PATH)]
    submodule_path: PathBuf,

    /// Device catalog endpoint
    #[arg(long, value_name = "URL", env = "ESR_CATALOG_URL", default_value = DEFAULT_CATALOG_URL)]
    catalog_url: String,

    /// Skip comparing processed devices against the catalog
    #[arg(long)]
    skip_catalog: bool,

    /// Directory for the run log file
    #[arg(long, value_name = "DIR", default_value = ".")]
    log_dir: PathBuf,

    /// Clone, edit and commit, but never push
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Deploy environment handed to the build hook for covered devices
    #[arg(long = "deploy-env", value_name = "ENV")]
    deploy_env: Option<String>,
}

fn parse_esr(value: &str) -> std::result::Result<EsrVersion, String> {
    EsrVersion::parse(value).map_err(|e| e.to_string())
}

fn parse_platform(value: &str) -> std::result::Result<PlatformVersion, String> {
    PlatformVersion::parse(value).map_err(|e| e.to_string())
}

impl Cli {
    /// Resolve the arguments into a `RunConfig`.
    pub fn run_config(&self) -> Result<RunConfig> {
        let mut config = RunConfig::new(self.esr_version.clone(), self.bos_version.clone());

        config.local_path = self.path.clone();
        config.keep_workspace = self.keep_tmp_dir;
        config.remote = self.remote.clone();
        config.submodule = self.submodule_path.clone();
        config.dry_run = self.dry_run;
        config.deploy_environment = self.deploy_env.clone();
        config.catalog_url = if self.skip_catalog {
            None
        } else {
            Some(self.catalog_url.clone())
        };

        if let Some(repos_file) = &self.repos_file {
            config.repositories = config::repository_list_from_file(repos_file)
                .with_context(|| format!("Failed to read repository list {}", repos_file.display()))?;
        }

        Ok(config)
    }

    /// Execute the ESR run
    pub fn execute(self) -> Result<RunReport> {
        let log_path = logging::init(&self.log_dir).context("Failed to set up logging")?;
        info!("Logging to {}", log_path.display());

        let config = self.run_config()?;
        info!(
            "Creating ESR {} branches for platform {}",
            config.esr, config.platform
        );

        let report = Orchestrator::new(&config).run(&config)?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_config_from_arguments() {
        let cli = Cli::try_parse_from([
            "esr-branches",
            "-e",
            "2020.07.1",
            "-b",
            "2.68",
            "--skip-catalog",
            "-n",
            "--remote",
            "upstream",
        ])
        .unwrap();

        let config = cli.run_config().unwrap();
        assert_eq!(config.esr.to_string(), "2020.07.1");
        assert_eq!(config.platform.as_str(), "2.68");
        assert_eq!(config.remote, "upstream");
        assert!(config.dry_run);
        assert!(config.catalog_url.is_none());
        assert!(config.local_path.is_none());
    }

    #[test]
    fn test_invalid_esr_version_is_rejected() {
        let err = Cli::try_parse_from(["esr-branches", "-e", "2020.7.1", "-b", "2.68"]).unwrap_err();
        assert!(err.to_string().contains("Invalid ESR version"));
    }

    #[test]
    fn test_missing_bos_version_is_rejected() {
        let err = Cli::try_parse_from(["esr-branches", "-e", "2020.07.1"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }
}
