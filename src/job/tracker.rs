use std::fmt;

use super::record::{JobCounters, JobId, JobRecord, JobStatus, JobType};
use crate::guard::guard;
use crate::run_log::RunLog;
use crate::service::{CreateJobRequest, ReportService, UpdateJobRequest};

/// Where a [`JobTracker`] is in its lifecycle.
///
/// Uninitialized → Created → Updated* → Finalized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    Uninitialized,
    Created,
    Updated,
    Finalized,
}

impl fmt::Display for TrackerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackerState::Uninitialized => write!(f, "UNINITIALIZED"),
            TrackerState::Created => write!(f, "CREATED"),
            TrackerState::Updated => write!(f, "UPDATED"),
            TrackerState::Finalized => write!(f, "FINALIZED"),
        }
    }
}

/// Keeps the remote job record of one pipeline run in step with the run.
///
/// Failing to create the record never stops the export: the tracker stays
/// `Uninitialized` and every later call becomes a no-op.
pub struct JobTracker {
    state: TrackerState,
    record: JobRecord,
    write_retries: u32,
}

impl JobTracker {
    pub fn new(job_type: JobType, label: String, host_label: String, write_retries: u32) -> Self {
        Self {
            state: TrackerState::Uninitialized,
            record: JobRecord::new(job_type, label, host_label),
            write_retries,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> TrackerState {
        self.state
    }

    pub fn job_id(&self) -> Option<JobId> {
        self.record.id
    }

    #[cfg(test)]
    pub fn record(&self) -> &JobRecord {
        &self.record
    }

    /// Create the remote record with status `InProgress`.
    ///
    /// Returns `None` when the service keeps failing. Calling this again after
    /// a successful create returns the existing id without a remote call.
    pub async fn create_job<S: ReportService>(
        &mut self,
        service: &S,
        log: &mut RunLog,
    ) -> Option<JobId> {
        if self.state != TrackerState::Uninitialized {
            return self.record.id;
        }

        let request = CreateJobRequest {
            job_type: self.record.job_type,
            status: JobStatus::InProgress,
            file_name: Some(self.record.label.clone()),
            host_name: Some(self.record.host_label.clone()),
            detail: None,
        };

        log.info("Creating an Integration Job for tracking purposes");
        match guard(log, "Create", self.write_retries, || service.create_job(&request)).await {
            Ok(created) => {
                self.record.assign_id(created.id);
                self.state = TrackerState::Created;
                tracing::debug!(job_id = created.id, label = %self.record.label, "job created");
                self.record.id
            }
            Err(detail) => {
                log.warn(format!(
                    "Continuing {} without a job record: {detail}",
                    self.record.label
                ));
                None
            }
        }
    }

    /// Send the current counters and detail without touching the status.
    pub async fn checkpoint<S: ReportService>(
        &mut self,
        service: &S,
        log: &mut RunLog,
        counters: &JobCounters,
    ) {
        if !matches!(self.state, TrackerState::Created | TrackerState::Updated) {
            return;
        }
        self.send(service, log, counters, None).await;
        self.state = TrackerState::Updated;
    }

    /// Commit the counters with the status they imply and close the tracker.
    ///
    /// Returns the committed status, or `None` when there is no record to
    /// finalize.
    pub async fn finalize<S: ReportService>(
        &mut self,
        service: &S,
        log: &mut RunLog,
        counters: &JobCounters,
    ) -> Option<JobStatus> {
        if !matches!(self.state, TrackerState::Created | TrackerState::Updated) {
            return None;
        }
        let status = counters.derived_status();
        self.send(service, log, counters, Some(status)).await;
        self.record.transition(status);
        self.state = TrackerState::Finalized;
        Some(status)
    }

    async fn send<S: ReportService>(
        &mut self,
        service: &S,
        log: &mut RunLog,
        counters: &JobCounters,
        status: Option<JobStatus>,
    ) {
        let Some(id) = self.record.id else {
            return;
        };
        log.info("Updating the Integration Job with results");
        let detail = log.detail_text();
        let request = UpdateJobRequest::new(id, counters, status, detail.clone());

        if let Err(failure) =
            guard(log, "Update", self.write_retries, || service.update_job(&request)).await
        {
            log.warn(format!("Job {id} was not updated: {failure}"));
            return;
        }
        self.record.counters = *counters;
        self.record.detail = detail;
    }
}

/// Record remotely that a run found no work at all.
///
/// The new record is created directly as `Completed`; no tracker is involved
/// because nothing follows it.
pub async fn record_nothing_to_process<S: ReportService>(
    service: &S,
    log: &mut RunLog,
    job_type: JobType,
    write_retries: u32,
) -> Option<JobId> {
    let request = CreateJobRequest {
        job_type,
        status: JobStatus::Completed,
        file_name: None,
        host_name: None,
        detail: Some("No files were available to process".to_string()),
    };

    log.info("Creating an Integration Job showing that no files were available to process");
    guard(log, "Create", write_retries, || service.create_job(&request))
        .await
        .ok()
        .map(|created| created.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::mock::MockService;

    fn tracker() -> JobTracker {
        JobTracker::new(
            JobType::ReportExport,
            "Sales_RID-10_2026-10-19T02:00:00".into(),
            "host-a".into(),
            3,
        )
    }

    fn counters(success: i64, fail: i64) -> JobCounters {
        JobCounters {
            total_records: success,
            total_unique_records: success,
            success_count: success,
            fail_count: fail,
        }
    }

    #[tokio::test]
    async fn full_lifecycle() {
        let service = MockService::new();
        let mut log = RunLog::new();
        let mut tracker = tracker();
        assert_eq!(tracker.state(), TrackerState::Uninitialized);

        let id = tracker.create_job(&service, &mut log).await;
        assert_eq!(id, Some(100));
        assert_eq!(tracker.state(), TrackerState::Created);

        tracker.checkpoint(&service, &mut log, &counters(10, 0)).await;
        assert_eq!(tracker.state(), TrackerState::Updated);

        let status = tracker.finalize(&service, &mut log, &counters(10, 0)).await;
        assert_eq!(status, Some(JobStatus::Completed));
        assert_eq!(tracker.state(), TrackerState::Finalized);
        assert_eq!(tracker.record().status, JobStatus::Completed);

        let created = service.created.borrow();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].status, JobStatus::InProgress);
        assert_eq!(created[0].host_name.as_deref(), Some("host-a"));

        let updates = service.updates.borrow();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].status, None);
        assert_eq!(updates[1].status, Some(JobStatus::Completed));
        assert_eq!(updates[1].id, 100);
    }

    #[tokio::test]
    async fn finalize_with_failures_is_completed_with_errors() {
        let service = MockService::new();
        let mut log = RunLog::new();
        let mut tracker = tracker();
        tracker.create_job(&service, &mut log).await;

        let status = tracker.finalize(&service, &mut log, &counters(13_400, 1)).await;
        assert_eq!(status, Some(JobStatus::CompletedWithErrors));
    }

    #[tokio::test]
    async fn create_failure_makes_everything_a_noop() {
        let service = MockService::new().failing_create();
        let mut log = RunLog::new();
        let mut tracker = tracker();

        assert_eq!(tracker.create_job(&service, &mut log).await, None);
        assert_eq!(service.create_attempts.get(), 4);
        assert_eq!(tracker.state(), TrackerState::Uninitialized);

        tracker.checkpoint(&service, &mut log, &counters(1, 0)).await;
        let status = tracker.finalize(&service, &mut log, &counters(1, 0)).await;
        assert_eq!(status, None);
        assert_eq!(service.update_attempts.get(), 0);
        assert!(log.detail_text().contains("without a job record"));
    }

    #[tokio::test]
    async fn calls_before_create_are_noops() {
        let service = MockService::new();
        let mut log = RunLog::new();
        let mut tracker = tracker();

        tracker.checkpoint(&service, &mut log, &counters(1, 0)).await;
        assert_eq!(tracker.finalize(&service, &mut log, &counters(1, 0)).await, None);
        assert_eq!(service.update_attempts.get(), 0);
    }

    #[tokio::test]
    async fn id_is_never_reassigned() {
        let service = MockService::new();
        let mut log = RunLog::new();
        let mut tracker = tracker();

        let first = tracker.create_job(&service, &mut log).await;
        let second = tracker.create_job(&service, &mut log).await;
        assert_eq!(first, second);
        assert_eq!(service.create_attempts.get(), 1);
    }

    #[tokio::test]
    async fn finalized_tracker_ignores_further_calls() {
        let service = MockService::new();
        let mut log = RunLog::new();
        let mut tracker = tracker();
        tracker.create_job(&service, &mut log).await;
        tracker.finalize(&service, &mut log, &counters(1, 1)).await;

        tracker.checkpoint(&service, &mut log, &counters(1, 0)).await;
        assert_eq!(tracker.finalize(&service, &mut log, &counters(1, 0)).await, None);
        assert_eq!(service.update_attempts.get(), 1);
        assert_eq!(tracker.record().status, JobStatus::CompletedWithErrors);
    }

    #[tokio::test]
    async fn update_failure_still_finalizes_locally() {
        let service = MockService::new().failing_update();
        let mut log = RunLog::new();
        let mut tracker = tracker();
        tracker.create_job(&service, &mut log).await;

        let status = tracker.finalize(&service, &mut log, &counters(5, 0)).await;
        assert_eq!(status, Some(JobStatus::Completed));
        assert_eq!(service.update_attempts.get(), 4);
        assert_eq!(tracker.state(), TrackerState::Finalized);
        assert!(log.detail_text().contains("Job 100 was not updated"));
    }

    #[tokio::test]
    async fn update_sends_visible_log_as_detail() {
        let service = MockService::new();
        let mut log = RunLog::new();
        log.info("Processing Job: Sales");
        log.note("local only");
        let mut tracker = tracker();
        tracker.create_job(&service, &mut log).await;
        tracker.checkpoint(&service, &mut log, &counters(1, 0)).await;

        let updates = service.updates.borrow();
        let detail = updates[0].detail.as_deref().unwrap();
        assert!(detail.contains("Processing Job: Sales"));
        assert!(!detail.contains("local only"));
    }

    #[tokio::test]
    async fn nothing_to_process_creates_completed_record() {
        let service = MockService::new();
        let mut log = RunLog::new();

        let id = record_nothing_to_process(&service, &mut log, JobType::ReportExport, 3).await;
        assert_eq!(id, Some(100));

        let created = service.created.borrow();
        assert_eq!(created[0].status, JobStatus::Completed);
        assert_eq!(
            created[0].detail.as_deref(),
            Some("No files were available to process")
        );
    }

    #[tokio::test]
    async fn nothing_to_process_tolerates_failure() {
        let service = MockService::new().failing_create();
        let mut log = RunLog::new();

        let id = record_nothing_to_process(&service, &mut log, JobType::ReportExport, 3).await;
        assert_eq!(id, None);
        assert_eq!(service.create_attempts.get(), 4);
    }
}
