//! In-memory [`ReportService`] used by unit tests across the crate.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};

use super::{
    CreateJobRequest, CreatedJob, ReportDefinition, ReportQuery, ReportService, ServiceError,
    UpdateJobRequest,
};
use crate::paging::RowBatch;

pub fn rows(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("{i},value-{i}")).collect()
}

fn unavailable() -> ServiceError {
    ServiceError::Api {
        status: 503,
        message: "service unavailable".into(),
    }
}

#[derive(Default)]
pub struct MockService {
    reports: HashMap<i64, Vec<String>>,
    names: HashMap<i64, String>,
    failing_reports: HashSet<i64>,
    fail_create: bool,
    fail_update: bool,
    next_id: Cell<i64>,
    pub create_attempts: Cell<u32>,
    pub update_attempts: Cell<u32>,
    pub created: RefCell<Vec<CreateJobRequest>>,
    pub updates: RefCell<Vec<UpdateJobRequest>>,
    pub page_calls: RefCell<Vec<(i64, u32, u32)>>,
}

impl MockService {
    pub fn new() -> Self {
        Self {
            next_id: Cell::new(100),
            ..Default::default()
        }
    }

    pub fn with_report(mut self, report_id: i64, rows: Vec<String>) -> Self {
        self.reports.insert(report_id, rows);
        self
    }

    pub fn with_name(mut self, report_id: i64, name: &str) -> Self {
        self.names.insert(report_id, name.to_string());
        self
    }

    pub fn with_failing_report(mut self, report_id: i64) -> Self {
        self.failing_reports.insert(report_id);
        self
    }

    pub fn failing_create(mut self) -> Self {
        self.fail_create = true;
        self
    }

    pub fn failing_update(mut self) -> Self {
        self.fail_update = true;
        self
    }

    pub fn page_calls_for(&self, report_id: i64) -> usize {
        self.page_calls
            .borrow()
            .iter()
            .filter(|(id, _, _)| *id == report_id)
            .count()
    }
}

impl ReportService for MockService {
    async fn create_job(&self, request: &CreateJobRequest) -> Result<CreatedJob, ServiceError> {
        self.create_attempts.set(self.create_attempts.get() + 1);
        if self.fail_create {
            return Err(unavailable());
        }
        self.created.borrow_mut().push(request.clone());
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        Ok(CreatedJob { id })
    }

    async fn update_job(&self, request: &UpdateJobRequest) -> Result<(), ServiceError> {
        self.update_attempts.set(self.update_attempts.get() + 1);
        if self.fail_update {
            return Err(unavailable());
        }
        self.updates.borrow_mut().push(request.clone());
        Ok(())
    }

    async fn run_report_page(
        &self,
        query: &ReportQuery,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<RowBatch>, ServiceError> {
        self.page_calls
            .borrow_mut()
            .push((query.report_id, limit, offset));
        if self.failing_reports.contains(&query.report_id) {
            return Err(unavailable());
        }
        let source = self
            .reports
            .get(&query.report_id)
            .map(Vec::as_slice)
            .unwrap_or_default();
        let start = (offset as usize).min(source.len());
        let end = (start + limit as usize).min(source.len());
        Ok(vec![RowBatch {
            name: format!("report-{}", query.report_id),
            columns: format!("id{}value", query.delimiter),
            rows: source[start..end].to_vec(),
        }])
    }

    async fn get_report(&self, report_id: i64) -> Result<ReportDefinition, ServiceError> {
        Ok(ReportDefinition {
            id: report_id,
            name: self.names.get(&report_id).cloned(),
        })
    }
}
