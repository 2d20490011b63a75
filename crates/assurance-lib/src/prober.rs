//! Device operational-state probe
//!
//! Reads an up/down style status string from a status source. Any failure
//! (timeout, error status, malformed body, missing field) degrades to
//! [`UNKNOWN_STATUS`].

use crate::error::ProbeError;
use crate::models::UNKNOWN_STATUS;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Field carrying the device status in the status document
pub const STATUS_FIELD: &str = "restconf_status";

/// A source of device status documents
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch(&self) -> Result<Value, ProbeError>;
}

/// Status source backed by an HTTP endpoint returning a JSON document
pub struct HttpStatusSource {
    client: Client,
    url: Url,
}

impl HttpStatusSource {
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create status HTTP client")?;
        let url = Url::parse(url).with_context(|| format!("Invalid status URL: {}", url))?;

        Ok(Self { client, url })
    }
}

#[async_trait]
impl StatusSource for HttpStatusSource {
    async fn fetch(&self) -> Result<Value, ProbeError> {
        let response = self.client.get(self.url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::Status(status.as_u16()));
        }

        response
            .json()
            .await
            .map_err(|e| ProbeError::Malformed(e.to_string()))
    }
}

/// Probes device state, never failing outward
#[derive(Clone)]
pub struct DeviceProber {
    source: Arc<dyn StatusSource>,
}

impl DeviceProber {
    pub fn new(source: Arc<dyn StatusSource>) -> Self {
        Self { source }
    }

    /// Device status string, or `"UNKNOWN"` on any failure
    pub async fn probe_status(&self) -> String {
        match self.source.fetch().await {
            Ok(document) => match extract_status(&document) {
                Some(status) => {
                    debug!(status = %status, "Device status probed");
                    status
                }
                None => {
                    warn!(field = STATUS_FIELD, "Status document missing status field");
                    UNKNOWN_STATUS.to_string()
                }
            },
            Err(e) => {
                warn!(error = %e, "Device status probe failed, using fallback");
                UNKNOWN_STATUS.to_string()
            }
        }
    }
}

fn extract_status(document: &Value) -> Option<String> {
    document
        .get(STATUS_FIELD)
        .and_then(Value::as_str)
        .map(str::to_string)
}
