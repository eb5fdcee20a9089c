use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier the remote service assigns to a job record.
pub type JobId = i64;

/// Kind of integration job recorded remotely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    ReportExport,
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobType::ReportExport => write!(f, "ReportExport"),
        }
    }
}

/// Lifecycle status of a remote job record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    InProgress,
    Completed,
    CompletedWithErrors,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, JobStatus::InProgress)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::InProgress => write!(f, "IN_PROGRESS"),
            JobStatus::Completed => write!(f, "COMPLETED"),
            JobStatus::CompletedWithErrors => write!(f, "COMPLETED_WITH_ERRORS"),
        }
    }
}

/// Run counters for one unit.
///
/// `success_count + fail_count` need not equal `total_records`: a failed
/// stage counts as one failure, not as one per row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCounters {
    pub total_records: i64,
    pub total_unique_records: i64,
    pub success_count: i64,
    pub fail_count: i64,
}

impl JobCounters {
    /// Fold the row count returned by the export stage into the counters.
    /// A negative count signals a failed export.
    pub fn record_export(&mut self, rows_written: i64) {
        self.total_records = rows_written;
        self.total_unique_records += rows_written;
        if rows_written < 0 {
            self.fail_count += 1;
        } else {
            self.success_count += rows_written;
        }
    }

    pub fn record_stage_failure(&mut self) {
        self.fail_count += 1;
    }

    pub fn derived_status(&self) -> JobStatus {
        if self.fail_count > 0 {
            JobStatus::CompletedWithErrors
        } else {
            JobStatus::Completed
        }
    }
}

/// Local view of the remote job record for one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: Option<JobId>,
    pub job_type: JobType,
    pub label: String,
    pub host_label: String,
    pub status: JobStatus,
    pub counters: JobCounters,
    pub detail: String,
}

impl JobRecord {
    pub fn new(job_type: JobType, label: String, host_label: String) -> Self {
        Self {
            id: None,
            job_type,
            label,
            host_label,
            status: JobStatus::InProgress,
            counters: JobCounters::default(),
            detail: String::new(),
        }
    }

    /// Assign the remote id. Returns `false` if one was already assigned.
    pub fn assign_id(&mut self, id: JobId) -> bool {
        if self.id.is_some() {
            return false;
        }
        self.id = Some(id);
        true
    }

    /// Move to `status`. Only `InProgress` to a terminal status is allowed.
    pub fn transition(&mut self, status: JobStatus) -> bool {
        if self.status.is_terminal() || !status.is_terminal() {
            return false;
        }
        self.status = status;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> JobRecord {
        JobRecord::new(JobType::ReportExport, "Sales_RID-10".into(), "host-a".into())
    }

    #[test]
    fn new_record_defaults() {
        let record = record();
        assert_eq!(record.id, None);
        assert_eq!(record.status, JobStatus::InProgress);
        assert_eq!(record.counters, JobCounters::default());
    }

    #[test]
    fn id_is_assigned_once() {
        let mut record = record();
        assert!(record.assign_id(7));
        assert!(!record.assign_id(8));
        assert_eq!(record.id, Some(7));
    }

    #[test]
    fn status_never_moves_backward() {
        let mut record = record();
        assert!(!record.transition(JobStatus::InProgress));
        assert!(record.transition(JobStatus::CompletedWithErrors));
        assert!(!record.transition(JobStatus::Completed));
        assert!(!record.transition(JobStatus::InProgress));
        assert_eq!(record.status, JobStatus::CompletedWithErrors);
    }

    #[test]
    fn derived_status_depends_only_on_failures() {
        let clean = JobCounters {
            success_count: 0,
            ..Default::default()
        };
        assert_eq!(clean.derived_status(), JobStatus::Completed);

        let mixed = JobCounters {
            success_count: 13_400,
            fail_count: 1,
            ..Default::default()
        };
        assert_eq!(mixed.derived_status(), JobStatus::CompletedWithErrors);
    }

    #[test]
    fn export_count_is_a_passthrough() {
        let mut counters = JobCounters::default();
        counters.record_export(13_400);
        assert_eq!(counters.total_records, 13_400);
        assert_eq!(counters.total_unique_records, 13_400);
        assert_eq!(counters.success_count, 13_400);
        assert_eq!(counters.fail_count, 0);
    }

    #[test]
    fn negative_export_count_is_one_failure() {
        let mut counters = JobCounters::default();
        counters.record_export(-1);
        assert_eq!(counters.fail_count, 1);
        assert_eq!(counters.success_count, 0);
        assert_eq!(counters.derived_status(), JobStatus::CompletedWithErrors);
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&JobStatus::CompletedWithErrors).unwrap();
        assert_eq!(json, r#""completed_with_errors""#);
        assert_eq!(JobStatus::CompletedWithErrors.to_string(), "COMPLETED_WITH_ERRORS");
    }

    #[test]
    fn job_type_serializes_snake_case() {
        let json = serde_json::to_string(&JobType::ReportExport).unwrap();
        assert_eq!(json, r#""report_export""#);
        let back: JobType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, JobType::ReportExport);
        assert_eq!(JobType::ReportExport.to_string(), "ReportExport");
    }
}
