//! Run logging with two sinks.
//!
//! Each run writes a timestamped log file at debug level and mirrors
//! info-level messages to the console. Both sinks are `env_logger` loggers;
//! `RunLogger` fans every record out to them. `RUST_LOG` overrides the
//! console filter only, so the file always holds the full run.

use std::fs::File;
use std::path::{Path, PathBuf};

use env_logger::{Builder, Env, Logger, Target, WriteStyle};
use log::{LevelFilter, Log, Metadata, Record};

use crate::defaults;
use crate::error::{Error, Result};

const CRATE_TARGET: &str = "esr_branches";

/// Logger that forwards every record to the console and to the run log file
pub struct RunLogger {
    console: Logger,
    file: Logger,
}

impl RunLogger {
    /// Build the console logger and a file logger writing to `log_path`.
    pub fn build(log_path: &Path) -> Result<Self> {
        let file = File::create(log_path).map_err(|e| Error::Logging {
            message: format!("cannot create {}: {}", log_path.display(), e),
        })?;

        let console = Builder::new()
            .filter_level(LevelFilter::Info)
            .format_timestamp_secs()
            .parse_env(Env::default())
            .build();

        let file = Builder::new()
            .filter_level(LevelFilter::Info)
            .filter_module(CRATE_TARGET, LevelFilter::Debug)
            .format_timestamp_secs()
            .write_style(WriteStyle::Never)
            .target(Target::Pipe(Box::new(file)))
            .build();

        Ok(Self { console, file })
    }

    /// Most verbose level either sink accepts
    pub fn max_level(&self) -> LevelFilter {
        self.console.filter().max(self.file.filter())
    }
}

impl Log for RunLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.console.enabled(metadata) || self.file.enabled(metadata)
    }

    fn log(&self, record: &Record) {
        self.console.log(record);
        self.file.log(record);
    }

    fn flush(&self) {
        self.console.flush();
        self.file.flush();
    }
}

/// Install the run logger, writing the log file into `log_dir`.
///
/// Returns the path of the log file.
pub fn init(log_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(log_dir)?;
    let log_path = log_dir.join(defaults::log_file_name());
    let logger = RunLogger::build(&log_path)?;

    log::set_max_level(logger.max_level());
    log::set_boxed_logger(Box::new(logger)).map_err(|e| Error::Logging {
        message: e.to_string(),
    })?;

    Ok(log_path)
}
