//! Export of one analytics report to a delimited file.

use chrono::{DateTime, Local};

use crate::artifact::{DEFAULT_JOB_NAME, ExportArtifact, export_file_name, sanitize_job_name};
use crate::config::RelayConfig;
use crate::delivery::Delivery;
use crate::error::ExportError;
use crate::guard::{RetryBudget, guard};
use crate::job::JobType;
use crate::paging::{PagedResultSet, fetch_all};
use crate::pipeline::{DeliveryOutcome, ExportStrategy};
use crate::run_log::RunLog;
use crate::service::{ReportQuery, ReportService};

/// Split a comma separated `--report-ids` value, dropping blanks.
pub fn parse_report_ids(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

pub struct ReportExport<'a, S, D> {
    service: &'a S,
    delivery: Option<&'a D>,
    config: &'a RelayConfig,
    raw_id: String,
    report_id: Option<i64>,
    job_name: String,
    run_time: DateTime<Local>,
    artifact: Option<ExportArtifact>,
}

impl<'a, S: ReportService, D: Delivery> ReportExport<'a, S, D> {
    pub fn new(service: &'a S, delivery: Option<&'a D>, config: &'a RelayConfig, report_id: &str) -> Self {
        Self {
            service,
            delivery,
            config,
            raw_id: report_id.to_string(),
            report_id: None,
            job_name: DEFAULT_JOB_NAME.to_string(),
            run_time: Local::now(),
            artifact: None,
        }
    }

    #[cfg(test)]
    pub fn artifact(&self) -> Option<&ExportArtifact> {
        self.artifact.as_ref()
    }

    fn report_id(&self) -> Result<i64, ExportError> {
        self.report_id
            .ok_or_else(|| ExportError::InvalidReportId(self.raw_id.clone()))
    }

    fn query(&self, report_id: i64) -> ReportQuery {
        ReportQuery {
            report_id,
            delimiter: self.config.export.delimiter.clone(),
            filters: self.config.export.filters.clone(),
        }
    }
}

impl<S: ReportService, D: Delivery> ExportStrategy for ReportExport<'_, S, D> {
    fn job_type(&self) -> JobType {
        JobType::ReportExport
    }

    fn label(&self) -> String {
        format!(
            "{}_RID-{}_{}",
            self.job_name,
            self.raw_id,
            self.run_time.format("%Y-%m-%dT%H:%M:%S")
        )
    }

    async fn prepare(&mut self, log: &mut RunLog) -> Result<(), ExportError> {
        let report_id = self
            .raw_id
            .parse::<i64>()
            .map_err(|_| ExportError::InvalidReportId(self.raw_id.clone()))?;
        self.report_id = Some(report_id);

        let service = self.service;
        let retries = self.config.retry_config().retries_for(RetryBudget::Write);
        match guard(log, "GetReport", retries, move || service.get_report(report_id)).await {
            Ok(report) => {
                if let Some(name) = report.name.filter(|n| !n.trim().is_empty()) {
                    self.job_name = sanitize_job_name(&name);
                }
            }
            Err(detail) => log.warn(format!(
                "Using default job name for report {report_id}: {detail}"
            )),
        }

        self.run_time = Local::now();
        Ok(())
    }

    async fn retrieve(&mut self, log: &mut RunLog) -> Result<PagedResultSet, ExportError> {
        let report_id = self.report_id()?;
        log.note(format!("Retrieving rows for Report ID: {report_id}"));

        let service = self.service;
        let query = self.query(report_id);
        let query = &query;
        let data = fetch_all(
            log,
            "RunReport",
            self.config.export.page_size,
            self.config.retry_config().retries_for(RetryBudget::Read),
            move |offset, limit| service.run_report_page(query, limit, offset),
        )
        .await?;
        Ok(data)
    }

    fn serialize(&mut self, log: &mut RunLog, data: &PagedResultSet) -> Result<i64, ExportError> {
        let report_id = self.report_id()?;
        if data.is_empty() {
            log.info(format!("No Records to process for Report ID: {report_id}."));
        }
        log.info(format!(
            "Creating Report Export CSV File for Report ID: {report_id}"
        ));

        let export = &self.config.export;
        let file_name = export_file_name(
            &self.job_name,
            &self.raw_id,
            &self.run_time,
            &export.export_file_date_format,
        );
        let artifact = ExportArtifact::new(&export.staging_directory, &file_name, export.file_has_headers);
        let artifact = self.artifact.insert(artifact);
        let rows = artifact.write_batches(log, data.batches())?;
        Ok(rows)
    }

    async fn post_process(&mut self, log: &mut RunLog) -> DeliveryOutcome {
        let Some(delivery) = self.delivery else {
            return DeliveryOutcome::NotConfigured;
        };
        let Some(artifact) = self.artifact.as_ref() else {
            let reason = format!("no export file was written for {}", self.label());
            log.warn(format!("Skipping upload: {reason}"));
            return DeliveryOutcome::Skipped(reason);
        };

        let file_name = artifact.file_name();
        log.info(format!(
            "Attempting to upload {file_name} to {}",
            delivery.destination()
        ));

        let retries = self.config.retry_config().retries_for(RetryBudget::Write);
        let path = artifact.path();
        match guard(log, "Upload", retries, move || delivery.upload(path)).await {
            Ok(()) => {
                log.info(format!(
                    "Successfully uploaded file {file_name} to {}",
                    delivery.destination()
                ));
                if self.config.delivery.remove_after_upload {
                    artifact.delete(log);
                }
                DeliveryOutcome::Delivered
            }
            Err(detail) => {
                log.error(format!("Error uploading file {file_name} - {detail}"));
                if !detail.causes.is_empty() {
                    log.note(format!("Upload causes:\n{}", detail.causal_chain()));
                }
                DeliveryOutcome::Failed(detail.to_string())
            }
        }
    }
}
