//! Output file naming for logs and reports.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// Second-granularity stamp used in every output file name.
const FILE_STAMP: &str = "%Y%m%d_%H%M%S";

/// Report file name encoding the run mode and start time.
pub fn report_file_name(dry_run: bool, run_started: DateTime<Utc>) -> String {
    let mode = if dry_run { "dry_run" } else { "disabled" };
    format!("accounts_{}_{}.csv", mode, run_started.format(FILE_STAMP))
}

/// Path of the log file for a run started at `run_started`.
pub fn log_file_path(log_dir: &Path, run_started: DateTime<Utc>) -> PathBuf {
    log_dir.join(format!(
        "disable_accounts_{}.log",
        run_started.format(FILE_STAMP)
    ))
}

/// Create the log directory if it does not exist yet.
pub fn init_log_directory(log_dir: &Path) -> Result<()> {
    if !log_dir.exists() {
        std::fs::create_dir_all(log_dir)
            .with_context(|| format!("Could not create log directory {}", log_dir.display()))?;
    }
    Ok(())
}
