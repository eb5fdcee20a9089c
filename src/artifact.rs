//! Delimited export files written to the staging directory.

use std::fmt::Write as _;
use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::paging::RowBatch;
use crate::run_log::RunLog;

pub const DEFAULT_JOB_NAME: &str = "ReportExport";

const FALLBACK_DATE_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Turn a report's display name into something safe to use in a file name.
pub fn sanitize_job_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' | ' ' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    if cleaned.is_empty() {
        DEFAULT_JOB_NAME.to_string()
    } else {
        cleaned
    }
}

/// Format `run_time` with a user supplied strftime pattern, falling back to
/// a fixed pattern when the supplied one is invalid.
pub fn format_run_time(run_time: &DateTime<Local>, pattern: &str) -> String {
    let mut out = String::new();
    if write!(out, "{}", run_time.format(pattern)).is_ok() {
        return out;
    }
    run_time.format(FALLBACK_DATE_FORMAT).to_string()
}

/// `<JobName>_RID-<id>_<run time>.csv`
pub fn export_file_name(
    job_name: &str,
    report_id: &str,
    run_time: &DateTime<Local>,
    date_format: &str,
) -> String {
    format!(
        "{job_name}_RID-{report_id}_{}.csv",
        format_run_time(run_time, date_format)
    )
}

/// One export file. Lines are CRLF terminated.
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    path: PathBuf,
    write_headers: bool,
}

impl ExportArtifact {
    pub fn new(directory: &Path, file_name: &str, write_headers: bool) -> Self {
        Self {
            path: directory.join(file_name),
            write_headers,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Append every batch, in order, and return the number of data rows.
    ///
    /// The header line is written once, from the first batch.
    pub fn write_batches(&self, log: &mut RunLog, batches: &[RowBatch]) -> io::Result<i64> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        log.note(format!("Creating CSV File: {}...", self.path.display()));

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut out = BufWriter::new(file);
        let mut header_written = false;
        let mut rows_written = 0i64;

        for batch in batches {
            if batch.rows.is_empty() {
                log.info(format!(
                    "No Record Returned for CSV File: {}.",
                    self.path.display()
                ));
            }
            if self.write_headers && !header_written {
                write!(out, "{}\r\n", batch.columns)?;
                header_written = true;
            }
            for row in &batch.rows {
                write!(out, "{row}\r\n")?;
            }
            rows_written += batch.rows.len() as i64;
        }

        out.flush()?;
        Ok(rows_written)
    }

    /// Remove the local file. Failure is logged, not returned.
    pub fn delete(&self, log: &mut RunLog) -> bool {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                log.info(format!("Removed local copy of file {}", self.path.display()));
                true
            }
            Err(err) => {
                log.error(format!(
                    "Error removing file: {} - {err}",
                    self.path.display()
                ));
                false
            }
        }
    }
}
