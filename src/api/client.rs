use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::Value;
use tracing::debug;

use crate::application::DashboardError;
use crate::domain::Report;

use super::{ReportQuery, REPORT_PATH};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/dashboards";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Anything that can produce a report for a set of filters.
#[async_trait]
pub trait ReportSource: Send + Sync {
    async fn fetch(&self, query: &ReportQuery) -> Result<Report, DashboardError>;
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// HTTP client for the reporting API.
pub struct ReportClient {
    client: Client,
    endpoint: Url,
}

impl ReportClient {
    pub fn new(config: &ClientConfig) -> Result<Self, DashboardError> {
        let endpoint = report_endpoint(&config.base_url)?;
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| DashboardError::Transport(e.to_string()))?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl ReportSource for ReportClient {
    async fn fetch(&self, query: &ReportQuery) -> Result<Report, DashboardError> {
        debug!(endpoint = %self.endpoint, empresa = %query.empresa, "requesting report");

        let resp = self
            .client
            .get(self.endpoint.clone())
            .header("Content-Type", "application/json")
            .query(&query.pairs())
            .send()
            .await
            .map_err(|e| DashboardError::Transport(e.to_string()))?;

        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| DashboardError::Transport(e.to_string()))?;

        interpret_response(status, &body)
    }
}

/// Build `{base}/api/graficos/dados-relatorio/`, tolerating a trailing slash.
pub fn report_endpoint(base_url: &str) -> Result<Url, DashboardError> {
    let base = format!("{}/", base_url.trim_end_matches('/'));
    Url::parse(&base)
        .and_then(|base| base.join(REPORT_PATH))
        .map_err(|e| DashboardError::InvalidBaseUrl(format!("{}: {}", base_url, e)))
}

/// Classify a finished HTTP exchange. Status is checked before the body, and
/// an HTML body is rejected before any JSON parsing is attempted.
pub fn interpret_response(status: u16, body: &str) -> Result<Report, DashboardError> {
    if !(200..300).contains(&status) {
        return Err(DashboardError::HttpStatus(status));
    }
    if body.starts_with("<!") || body.starts_with("<html") {
        return Err(DashboardError::HtmlResponse);
    }
    let json: Value =
        serde_json::from_str(body).map_err(|e| DashboardError::InvalidJson(e.to_string()))?;
    Ok(Report::from_payload(&json))
}
