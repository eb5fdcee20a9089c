//! Wire types for the report service's JSON endpoints.

use serde::{Deserialize, Serialize};

use crate::job::{JobCounters, JobId, JobStatus, JobType};
use crate::paging::RowBatch;

/// Body of `POST /jobs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateJobRequest {
    pub job_type: JobType,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Response of `POST /jobs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedJob {
    pub id: JobId,
}

/// Body of `PATCH /jobs/{id}`. `status` is left out on interim checkpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateJobRequest {
    #[serde(skip)]
    pub id: JobId,
    pub count_of_rows: i64,
    pub count_of_unique_rows: i64,
    pub count_of_success: i64,
    pub count_of_failure: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl UpdateJobRequest {
    pub fn new(id: JobId, counters: &JobCounters, status: Option<JobStatus>, detail: String) -> Self {
        Self {
            id,
            count_of_rows: counters.total_records,
            count_of_unique_rows: counters.total_unique_records,
            count_of_success: counters.success_count,
            count_of_failure: counters.fail_count,
            status,
            detail: (!detail.is_empty()).then_some(detail),
        }
    }
}

/// A report filter, passed through to the service untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportFilter {
    pub name: String,
    #[serde(default = "default_operator")]
    pub operator: String,
    #[serde(default)]
    pub values: Vec<String>,
}

fn default_operator() -> String {
    "=".to_string()
}

/// What to run: a report id plus the parameters shared by every page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportQuery {
    pub report_id: i64,
    pub delimiter: String,
    pub filters: Vec<ReportFilter>,
}

/// Body of `POST /reports/{id}/run`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReportRequest {
    pub limit: u32,
    pub offset: u32,
    pub delimiter: String,
    #[serde(default)]
    pub filters: Vec<ReportFilter>,
}

/// Response of `POST /reports/{id}/run`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReportResponse {
    #[serde(default)]
    pub tables: Vec<RowBatch>,
}

/// Response of `GET /reports/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDefinition {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
}
