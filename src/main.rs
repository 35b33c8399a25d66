//! # ESR Branches CLI
//!
//! This is the binary entry point for the `esr-branches` command-line tool.
//!
//! Its responsibilities are:
//! - Parsing command-line arguments using `clap`. Help and version requests
//!   exit 0; any other argument error prints usage and exits 1.
//! - Running the ESR orchestration. Fatal errors and repositories that
//!   failed both end with a non-zero exit status.
//!
//! The core application logic is defined in the `lib.rs` library crate, so
//! the binary stays a thin wrapper.

mod cli;

use std::process::ExitCode;

use anyhow::Result;
use clap::error::ErrorKind;
use clap::Parser;

fn main() -> Result<ExitCode> {
    let cli = match cli::Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            e.print()?;
            return Ok(ExitCode::FAILURE);
        }
    };

    let report = cli.execute()?;
    if report.failures().is_empty() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
