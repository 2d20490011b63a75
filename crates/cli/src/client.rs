//! API client for communicating with a running assurance agent

use anyhow::{Context, Result};
use assurance_lib::health::{HealthResponse, ServiceInfo};
use assurance_lib::models::{ComplianceReport, ErrorReport};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

/// Failure reported by the agent itself, as opposed to a transport failure
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("API error ({status}): {body}")]
    Api { status: StatusCode, body: String },
    #[error("agent could not produce a compliance report: {0}")]
    Pipeline(String),
}

/// Outcome of a compliance status request
#[derive(Debug, Clone)]
pub enum ComplianceResponse {
    Report(ComplianceReport),
    Error(ErrorReport),
}

/// API client for the assurance agent
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Make a GET request, accepting a JSON body only with a 2xx status
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let (status, body) = self.get_raw(path).await?;

        if !status.is_success() {
            return Err(ClientError::Api { status, body }.into());
        }

        serde_json::from_str(&body).context("Failed to parse response")
    }

    /// Fetch a fresh compliance report; the 500 error document is a valid answer
    pub async fn compliance_status(&self) -> Result<ComplianceResponse> {
        let (status, body) = self.get_raw("assurance/compliance-status").await?;

        match status {
            s if s.is_success() => serde_json::from_str(&body)
                .map(ComplianceResponse::Report)
                .context("Failed to parse compliance report"),
            StatusCode::INTERNAL_SERVER_ERROR => match serde_json::from_str(&body) {
                Ok(error) => Ok(ComplianceResponse::Error(error)),
                Err(_) => Err(ClientError::Api { status, body }.into()),
            },
            _ => Err(ClientError::Api { status, body }.into()),
        }
    }

    /// Static service document from `/health`
    pub async fn service_info(&self) -> Result<ServiceInfo> {
        self.get("health").await
    }

    /// Component health from `/healthz`; a 503 still carries the document
    pub async fn component_health(&self) -> Result<HealthResponse> {
        let (status, body) = self.get_raw("healthz").await?;

        if status.is_success() || status == StatusCode::SERVICE_UNAVAILABLE {
            serde_json::from_str(&body).context("Failed to parse health response")
        } else {
            Err(ClientError::Api { status, body }.into())
        }
    }

    async fn get_raw(&self, path: &str) -> Result<(StatusCode, String)> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        let status = response.status();
        let body = response.text().await.context("Failed to read response")?;
        Ok((status, body))
    }
}
