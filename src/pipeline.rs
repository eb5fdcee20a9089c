use serde::Serialize;

use crate::config::RelayConfig;
use crate::error::ExportError;
use crate::guard::RetryConfig;
use crate::job::{JobCounters, JobId, JobStatus, JobTracker, JobType, record_nothing_to_process};
use crate::paging::PagedResultSet;
use crate::run_log::RunLog;
use crate::service::ReportService;

/// The pieces of an export that vary per kind of unit.
///
/// The controller owns the stage order; a strategy only fills the stages in.
#[allow(async_fn_in_trait)]
pub trait ExportStrategy {
    fn job_type(&self) -> JobType;

    /// Label identifying the unit in logs and on the job record.
    fn label(&self) -> String;

    /// Resolve anything the label or later stages depend on.
    async fn prepare(&mut self, _log: &mut RunLog) -> Result<(), ExportError> {
        Ok(())
    }

    async fn retrieve(&mut self, log: &mut RunLog) -> Result<PagedResultSet, ExportError>;

    /// Write the retrieved rows out and return how many were written.
    /// A negative count reports a failed export.
    fn serialize(&mut self, log: &mut RunLog, data: &PagedResultSet) -> Result<i64, ExportError>;

    /// Deliver whatever `serialize` produced. Failures are logged here and
    /// reported through the outcome only.
    async fn post_process(&mut self, log: &mut RunLog) -> DeliveryOutcome;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    NotConfigured,
    Skipped(String),
    Delivered,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum UnitOutcome {
    Exported,
    NothingToExport,
    Failed(String),
}

/// What happened to one unit of a batch.
#[derive(Debug, Clone, Serialize)]
pub struct UnitReport {
    pub label: String,
    pub outcome: UnitOutcome,
    pub job_id: Option<JobId>,
    pub status: Option<JobStatus>,
    pub counters: JobCounters,
    pub delivery: DeliveryOutcome,
}

impl UnitReport {
    fn without_job(label: String, outcome: UnitOutcome) -> Self {
        Self {
            label,
            outcome,
            job_id: None,
            status: None,
            counters: JobCounters::default(),
            delivery: DeliveryOutcome::Skipped("nothing exported".to_string()),
        }
    }
}

/// Per-unit reports of a whole batch, in input order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub units: Vec<UnitReport>,
    /// Job recorded because no unit had anything to export.
    pub empty_run_job: Option<JobId>,
}

impl RunSummary {
    pub fn count(&self, pred: impl Fn(&UnitOutcome) -> bool) -> usize {
        self.units.iter().filter(|u| pred(&u.outcome)).count()
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, UnitOutcome::Failed(_)))
    }

    pub fn exported(&self) -> usize {
        self.count(|o| matches!(o, UnitOutcome::Exported))
    }
}

/// Drives units through retrieve, export, checkpoint and finalize + deliver.
pub struct ExportPipeline<'a, S> {
    service: &'a S,
    host_label: String,
    retries: RetryConfig,
    record_empty_runs: bool,
}

impl<'a, S: ReportService> ExportPipeline<'a, S> {
    pub fn new(service: &'a S, host_label: String, retries: RetryConfig, record_empty_runs: bool) -> Self {
        Self {
            service,
            host_label,
            retries,
            record_empty_runs,
        }
    }

    pub fn from_config(service: &'a S, config: &RelayConfig) -> Self {
        Self::new(
            service,
            config.host_label(),
            config.retry_config(),
            config.export.record_empty_runs,
        )
    }

    /// Run one unit. Errors returned here are contained by [`Self::run_batch`].
    ///
    /// A unit with nothing to export never creates a job record. Once a job
    /// exists, the checkpoint and finalize stages run even if the export
    /// stage failed; that failure counts once in `fail_count`.
    pub async fn run_unit<U: ExportStrategy>(
        &self,
        unit: &mut U,
        log: &mut RunLog,
    ) -> Result<UnitReport, ExportError> {
        unit.prepare(log).await?;
        let label = unit.label();
        log.info(format!("Processing Job: {label}"));

        let mut counters = JobCounters::default();

        let data = unit.retrieve(log).await?;
        if data.is_empty() {
            log.info(format!("No records to export for {label}"));
            return Ok(UnitReport::without_job(label, UnitOutcome::NothingToExport));
        }

        let mut tracker = JobTracker::new(
            unit.job_type(),
            label.clone(),
            self.host_label.clone(),
            self.retries.write_retries,
        );
        tracker.create_job(self.service, log).await;

        match unit.serialize(log, &data) {
            Ok(rows) => counters.record_export(rows),
            Err(err) => {
                log.error(format!("Error exporting {label} - {err}"));
                counters.record_stage_failure();
            }
        }

        tracker.checkpoint(self.service, log, &counters).await;
        let status = tracker.finalize(self.service, log, &counters).await;

        let delivery = unit.post_process(log).await;

        Ok(UnitReport {
            label,
            outcome: UnitOutcome::Exported,
            job_id: tracker.job_id(),
            status,
            counters,
            delivery,
        })
    }

    /// Run every unit in order. A failing unit is logged and recorded in the
    /// summary; it never stops the units after it.
    pub async fn run_batch<U: ExportStrategy>(
        &self,
        units: Vec<U>,
        log: &mut RunLog,
        mut on_unit: impl FnMut(&UnitReport),
    ) -> RunSummary {
        let mut summary = RunSummary::default();

        for mut unit in units {
            let report = match self.run_unit(&mut unit, log).await {
                Ok(report) => report,
                Err(err) => {
                    let label = unit.label();
                    log.error(format!("Error processing: {label} - {err}"));
                    UnitReport::without_job(label, UnitOutcome::Failed(err.to_string()))
                }
            };
            on_unit(&report);
            summary.units.push(report);
        }

        let nothing_exported = summary
            .units
            .iter()
            .all(|u| u.outcome == UnitOutcome::NothingToExport);
        if self.record_empty_runs && nothing_exported {
            summary.empty_run_job = record_nothing_to_process(
                self.service,
                log,
                JobType::ReportExport,
                self.retries.write_retries,
            )
            .await;
        }

        summary
    }
}
