pub mod client;
pub mod error;
#[cfg(test)]
pub mod mock;
pub mod types;

pub use client::HttpReportService;
pub use error::ServiceError;
pub use types::{
    CreateJobRequest, CreatedJob, ReportDefinition, ReportFilter, ReportQuery, UpdateJobRequest,
};

use crate::paging::RowBatch;

/// Operations consumed from the remote analytics service.
///
/// Implementations make exactly one remote call per method; retries are the
/// caller's business (see [`crate::guard`]).
#[allow(async_fn_in_trait)]
pub trait ReportService {
    async fn create_job(&self, request: &CreateJobRequest) -> Result<CreatedJob, ServiceError>;

    async fn update_job(&self, request: &UpdateJobRequest) -> Result<(), ServiceError>;

    /// Run one page of a report: at most `limit` rows starting at `offset`.
    async fn run_report_page(
        &self,
        query: &ReportQuery,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<RowBatch>, ServiceError>;

    async fn get_report(&self, report_id: i64) -> Result<ReportDefinition, ServiceError>;
}
