//! Audit report for expired accounts.
//!
//! Rows accumulate in memory during the run and are written once, at the end,
//! as a CSV file. Nothing is written when no account expired.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::error::ReportError;
use crate::paths;

/// What happened (or would have happened) to an expired account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    WouldDisable,
    Disabled,
    Failed,
}

/// One audit line.
///
/// Only `action`, `error` and `new_disable_reason` change after creation, and
/// only through [`AccountReportRow::mark_disabled`] and [`AccountReportRow::mark_failed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountReportRow {
    pub email: String,
    pub user_id: String,
    pub created_at: String,
    pub days_old: i64,
    pub days_over_threshold: i64,
    pub connection_type: String,
    pub existing_disable_reason: String,
    action: Action,
    error: Option<String>,
    new_disable_reason: Option<String>,
}

impl AccountReportRow {
    pub fn new(
        email: impl Into<String>,
        user_id: impl Into<String>,
        created_at: DateTime<Utc>,
        days_old: i64,
        days_over_threshold: i64,
        connection_type: impl Into<String>,
        existing_disable_reason: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            user_id: user_id.into(),
            created_at: created_at.format("%Y-%m-%d").to_string(),
            days_old,
            days_over_threshold,
            connection_type: connection_type.into(),
            existing_disable_reason: existing_disable_reason.into(),
            action: Action::WouldDisable,
            error: None,
            new_disable_reason: None,
        }
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn new_disable_reason(&self) -> Option<&str> {
        self.new_disable_reason.as_deref()
    }

    pub fn mark_disabled(&mut self, reason: String) {
        self.action = Action::Disabled;
        self.new_disable_reason = Some(reason);
        self.error = None;
    }

    pub fn mark_failed(&mut self, error: String) {
        self.action = Action::Failed;
        self.error = Some(error);
        self.new_disable_reason = None;
    }
}

/// CSV line layout. Field order must match [`COLUMNS`].
#[derive(Serialize)]
struct CsvRecord<'a> {
    script_run_date: &'a str,
    email: &'a str,
    user_id: &'a str,
    created_at: &'a str,
    days_old: i64,
    days_over_threshold: i64,
    connection_type: &'a str,
    existing_disable_reason: &'a str,
    action: Action,
    error: Option<&'a str>,
    new_disable_reason: Option<&'a str>,
}

/// Column names, in order.
pub const COLUMNS: [&str; 11] = [
    "script_run_date",
    "email",
    "user_id",
    "created_at",
    "days_old",
    "days_over_threshold",
    "connection_type",
    "existing_disable_reason",
    "action",
    "error",
    "new_disable_reason",
];

/// Accumulates report rows for one run and persists them at the end.
#[derive(Debug)]
pub struct Reporter {
    report_dir: PathBuf,
    dry_run: bool,
    run_started: DateTime<Utc>,
    rows: Vec<AccountReportRow>,
}

impl Reporter {
    pub fn new(report_dir: impl Into<PathBuf>, dry_run: bool, run_started: DateTime<Utc>) -> Self {
        Self {
            report_dir: report_dir.into(),
            dry_run,
            run_started,
            rows: Vec::new(),
        }
    }

    pub fn record(&mut self, row: AccountReportRow) {
        self.rows.push(row);
    }

    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Write the report. Returns the file path, or `None` when there was nothing to report.
    pub fn finish(&self) -> Result<Option<PathBuf>, ReportError> {
        if self.rows.is_empty() {
            info!("No accounts met disable criteria - no report generated");
            return Ok(None);
        }

        fs::create_dir_all(&self.report_dir).map_err(|source| ReportError::Io {
            path: self.report_dir.display().to_string(),
            source,
        })?;

        let path = self
            .report_dir
            .join(paths::report_file_name(self.dry_run, self.run_started));
        write_atomically(&path, &self.rows, self.run_started)?;

        info!("Report saved to {}", path.display());
        Ok(Some(path))
    }
}

/// Write to a sibling temp file, then rename into place.
fn write_atomically(
    path: &Path,
    rows: &[AccountReportRow],
    run_started: DateTime<Utc>,
) -> Result<(), ReportError> {
    let tmp_path = path.with_extension("csv.partial");
    let io_error = |target: &Path| {
        let target = target.display().to_string();
        move |source: std::io::Error| ReportError::Io {
            path: target,
            source,
        }
    };

    let file = File::create(&tmp_path).map_err(io_error(&tmp_path))?;
    let result = write_rows(file, &tmp_path, rows, run_started);
    if let Err(e) = result {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }

    fs::rename(&tmp_path, path).map_err(io_error(path))
}

fn write_rows(
    file: File,
    path: &Path,
    rows: &[AccountReportRow],
    run_started: DateTime<Utc>,
) -> Result<(), ReportError> {
    let run_date = run_started.format("%Y-%m-%d %H:%M:%S UTC").to_string();
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    writer.write_record(COLUMNS)?;

    for row in rows {
        writer.serialize(CsvRecord {
            script_run_date: &run_date,
            email: &row.email,
            user_id: &row.user_id,
            created_at: &row.created_at,
            days_old: row.days_old,
            days_over_threshold: row.days_over_threshold,
            connection_type: &row.connection_type,
            existing_disable_reason: &row.existing_disable_reason,
            action: row.action(),
            error: row.error(),
            new_disable_reason: row.new_disable_reason(),
        })?;
    }

    writer.flush().map_err(|source| ReportError::Io {
        path: path.display().to_string(),
        source,
    })
}
