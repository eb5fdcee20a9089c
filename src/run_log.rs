//! Append-only run log shared by every unit of a batch.
//!
//! Each entry is mirrored to `tracing` as it is recorded. Entries marked
//! [`Visibility::Visible`] also make up the detail text written back to the
//! remote job record, so operators without file-system access see them.
//! The whole log is rendered once, at process exit.

use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use uuid::Uuid;

const SEPARATOR: &str = "---------------------------------------------------------";

/// Where a log entry ends up besides the local log file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Local log file only.
    Local,
    /// Local log file and the remote job's detail field.
    Visible,
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub at: DateTime<Local>,
    pub message: String,
    pub visibility: Visibility,
}

/// The run context threaded through the pipeline.
#[derive(Debug)]
pub struct RunLog {
    run_id: Uuid,
    entries: Vec<LogEntry>,
}

impl Default for RunLog {
    fn default() -> Self {
        Self::new()
    }
}

impl RunLog {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            entries: Vec::new(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    #[cfg(test)]
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Diagnostic detail kept out of the remote job record.
    pub fn note(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(run_id = %self.run_id, "{message}");
        self.push(message, Visibility::Local);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!(run_id = %self.run_id, "{message}");
        self.push(message, Visibility::Visible);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(run_id = %self.run_id, "{message}");
        self.push(message, Visibility::Visible);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::error!(run_id = %self.run_id, "{message}");
        self.push(message, Visibility::Visible);
    }

    fn push(&mut self, message: String, visibility: Visibility) {
        self.entries.push(LogEntry {
            at: Local::now(),
            message,
            visibility,
        });
    }

    /// Text sent as the remote job's detail: every visible entry, one per line.
    pub fn detail_text(&self) -> String {
        let mut out = String::new();
        for entry in self
            .entries
            .iter()
            .filter(|e| e.visibility == Visibility::Visible)
        {
            out.push_str(&entry.message);
            out.push('\n');
        }
        out
    }

    /// Render the full log followed by the reason the process is exiting.
    pub fn render(&self, exit_reason: &str) -> String {
        let mut out = format!("Run {}\n", self.run_id);
        for entry in &self.entries {
            out.push_str(SEPARATOR);
            out.push('\n');
            out.push_str(&format!("{}:\n", entry.at.format("%Y-%m-%d %H:%M:%S%.3f")));
            out.push_str(&entry.message);
            out.push('\n');
        }
        if !exit_reason.is_empty() {
            out.push_str(exit_reason);
            out.push('\n');
        }
        out
    }

    /// Write the rendered log into `dir`, creating it when missing.
    pub fn write_to(&self, dir: &Path, exit_reason: &str) -> io::Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let file_name = format!(
            "{}_report-relay_log.txt",
            Local::now().format("%Y-%m-%d_%H-%M-%S")
        );
        let path = dir.join(file_name);
        std::fs::write(&path, self.render(exit_reason))?;
        Ok(path)
    }
}
