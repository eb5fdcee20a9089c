use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};

use super::ReportService;
use super::error::ServiceError;
use super::types::{
    CreateJobRequest, CreatedJob, ReportDefinition, ReportQuery, RunReportRequest,
    RunReportResponse, UpdateJobRequest,
};
use crate::paging::RowBatch;

const APP_ID: &str = concat!("report-relay/", env!("CARGO_PKG_VERSION"));

/// JSON-over-HTTP client for the analytics service.
pub struct HttpReportService {
    client: Client,
    base_url: String,
    user: String,
    password: String,
}

impl HttpReportService {
    pub fn new(base_url: String, user: String, password: String) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .user_agent(APP_ID)
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(300))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            user,
            password,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request.basic_auth(&self.user, Some(&self.password))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ServiceError> {
        let response = self.authed(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(ServiceError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }
}

impl ReportService for HttpReportService {
    async fn create_job(&self, request: &CreateJobRequest) -> Result<CreatedJob, ServiceError> {
        let response = self
            .send(self.client.post(self.url("jobs")).json(request))
            .await?;
        Ok(response.json::<CreatedJob>().await?)
    }

    async fn update_job(&self, request: &UpdateJobRequest) -> Result<(), ServiceError> {
        let url = self.url(&format!("jobs/{}", request.id));
        self.send(self.client.patch(url).json(request)).await?;
        Ok(())
    }

    async fn run_report_page(
        &self,
        query: &ReportQuery,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<RowBatch>, ServiceError> {
        let body = RunReportRequest {
            limit,
            offset,
            delimiter: query.delimiter.clone(),
            filters: query.filters.clone(),
        };
        let url = self.url(&format!("reports/{}/run", query.report_id));
        let response = self.send(self.client.post(url).json(&body)).await?;
        let page = response.json::<RunReportResponse>().await?;
        Ok(page.tables)
    }

    async fn get_report(&self, report_id: i64) -> Result<ReportDefinition, ServiceError> {
        let url = self.url(&format!("reports/{report_id}"));
        let response = self.send(self.client.get(url)).await?;
        let report = response.json::<ReportDefinition>().await?;
        if report.id != report_id {
            return Err(ServiceError::Rejected(format!(
                "asked for report {report_id}, got {}",
                report.id
            )));
        }
        Ok(report)
    }
}
