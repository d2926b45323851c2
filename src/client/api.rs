use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::multipart::{Form, Part};
use reqwest::{Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::client::ReportApi;
use crate::models::{
    AuthResponse, CreatedResponse, LoginRequest, MessageResponse, NewReport, RegisterRequest, Report, ReportPatch,
};
use crate::utils::normalization::normalize_all;

pub const DEFAULT_API_URL: &str = "http://localhost:4000";
const USER_AGENT: &str = concat!("helpdesk-dashboard/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Non-2xx answer; `message` is the server's `{"message"}` text when present.
    #[error("{message} (HTTP {status})")]
    Api { status: StatusCode, message: String },
    #[error("cannot read {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid API URL '{0}'")]
    InvalidUrl(String),
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Http(e) => e.status(),
            _ => None,
        }
    }
}

/// HTTP client for the report service.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    base: Url,
    http: reqwest::Client,
    roster: Vec<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration, roster: Vec<String>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        let base = Url::parse(base_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| ClientError::InvalidUrl(base_url.to_string()))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            base,
            http,
            roster,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `/api/reportes/<id>` with the id percent-encoded as a single path segment.
    fn report_url(&self, id: &str) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(["api", "reportes", id]);
        }
        url
    }

    async fn parse<T: DeserializeOwned>(resp: Response) -> Result<T, ClientError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp.json::<T>().await?);
        }
        let text = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<MessageResponse>(&text)
            .map(|m| m.message)
            .unwrap_or(text);
        Err(ClientError::Api { status, message })
    }

    /// Fetches and normalizes the full list. Records without an id are dropped.
    pub async fn list_reports(&self) -> Result<Vec<Report>, ClientError> {
        let resp = self.http.get(self.url("/api/reportes")).send().await?;
        let raw: Vec<Value> = Self::parse(resp).await?;
        debug!("Fetched {} raw reports", raw.len());
        Ok(normalize_all(&raw, Utc::now(), &self.roster))
    }

    pub async fn create_report(&self, report: &NewReport) -> Result<CreatedResponse, ClientError> {
        let resp = self
            .http
            .post(self.url("/api/reportes"))
            .json(report)
            .send()
            .await?;
        Self::parse(resp).await
    }

    /// Sends the report as multipart with the given files attached under `imagenes`.
    pub async fn create_report_with_images(
        &self,
        report: &NewReport,
        images: &[PathBuf],
    ) -> Result<CreatedResponse, ClientError> {
        let mut form = Form::new().text("data", serde_json::to_string(report)?);
        for path in images {
            form = form.part("imagenes", file_part(path).await?);
        }
        let resp = self
            .http
            .post(self.url("/api/reportes"))
            .multipart(form)
            .send()
            .await?;
        Self::parse(resp).await
    }

    pub async fn update_report(&self, id: &str, patch: &ReportPatch) -> Result<MessageResponse, ClientError> {
        let resp = self
            .http
            .patch(self.report_url(id))
            .json(patch)
            .send()
            .await?;
        Self::parse(resp).await
    }

    pub async fn delete_report(&self, id: &str) -> Result<MessageResponse, ClientError> {
        let resp = self
            .http
            .delete(self.report_url(id))
            .send()
            .await?;
        Self::parse(resp).await
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ClientError> {
        let resp = self.http.post(self.url("/api/register")).json(request).send().await?;
        Self::parse(resp).await
    }

    pub async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ClientError> {
        let resp = self.http.post(self.url("/api/login")).json(request).send().await?;
        Self::parse(resp).await
    }
}

async fn file_part(path: &Path) -> Result<Part, ClientError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| ClientError::File {
        path: path.to_path_buf(),
        source,
    })?;
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("imagen")
        .to_string();
    Ok(Part::bytes(bytes).file_name(name))
}

#[async_trait]
impl ReportApi for ApiClient {
    async fn fetch_reports(&self) -> Result<Vec<Report>, ClientError> {
        self.list_reports().await
    }

    async fn submit_report(&self, report: &NewReport) -> Result<String, ClientError> {
        Ok(self.create_report(report).await?.id)
    }

    async fn patch_report(&self, id: &str, patch: &ReportPatch) -> Result<(), ClientError> {
        self.update_report(id, patch).await.map(|_| ())
    }

    async fn remove_report(&self, id: &str) -> Result<(), ClientError> {
        self.delete_report(id).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_is_trimmed() {
        let client = ApiClient::new("http://localhost:4000/", Duration::from_secs(5), vec![]).unwrap();
        assert_eq!(client.base_url(), "http://localhost:4000");
        assert_eq!(client.url("/api/reportes"), "http://localhost:4000/api/reportes");
    }

    #[test]
    fn test_report_ids_are_encoded_as_one_segment() {
        let client = ApiClient::new("http://localhost:4000", Duration::from_secs(5), vec![]).unwrap();
        assert_eq!(client.report_url("R-1").as_str(), "http://localhost:4000/api/reportes/R-1");
        assert_eq!(client.report_url("A/B").as_str(), "http://localhost:4000/api/reportes/A%2FB");
        assert_eq!(client.report_url("R 1#x").as_str(), "http://localhost:4000/api/reportes/R%201%23x");
        assert_eq!(client.report_url("q?x=1").as_str(), "http://localhost:4000/api/reportes/q%3Fx=1");

        let prefixed = ApiClient::new("http://intranet/helpdesk/", Duration::from_secs(5), vec![]).unwrap();
        assert_eq!(prefixed.report_url("A/B").as_str(), "http://intranet/helpdesk/api/reportes/A%2FB");
    }

    #[test]
    fn test_rejects_unusable_base_url() {
        assert!(matches!(
            ApiClient::new("localhost:4000", Duration::from_secs(5), vec![]),
            Err(ClientError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_api_error_display() {
        let err = ClientError::Api {
            status: StatusCode::NOT_FOUND,
            message: "Reporte no encontrado".to_string(),
        };
        assert_eq!(err.to_string(), "Reporte no encontrado (HTTP 404 Not Found)");
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
    }
}
