//! HTTP telemetry source
//!
//! Talks to an SNMP-to-HTTP gateway. A query is a single GET carrying one
//! `oid` parameter per counter; the gateway answers with a varbind list:
//!
//! ```json
//! {"varbinds": [{"oid": "sysUpTime.0", "value": 4242}, {"oid": "tcpInSegs.0", "value": null}]}
//! ```

use super::TelemetrySource;
use crate::error::TelemetryError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

#[derive(Debug, Deserialize)]
struct VarBindList {
    varbinds: Vec<VarBind>,
}

#[derive(Debug, Deserialize)]
struct VarBind {
    oid: String,
    value: Option<u64>,
}

/// Telemetry source backed by an HTTP counter gateway
pub struct HttpTelemetrySource {
    client: Client,
    endpoint: Url,
}

impl HttpTelemetrySource {
    /// Create a source with a single-attempt request timeout
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create telemetry HTTP client")?;
        let endpoint = Url::parse(endpoint)
            .with_context(|| format!("Invalid telemetry endpoint: {}", endpoint))?;

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn query_url(&self, oids: &[&str]) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            for oid in oids {
                query.append_pair("oid", oid);
            }
        }
        url
    }
}

#[async_trait]
impl TelemetrySource for HttpTelemetrySource {
    async fn get(&self, oids: &[&str]) -> Result<Vec<Option<u64>>, TelemetryError> {
        let response = self.client.get(self.query_url(oids)).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TelemetryError::Status(status.as_u16()));
        }

        let body: VarBindList = response
            .json()
            .await
            .map_err(|e| TelemetryError::Malformed(e.to_string()))?;

        Ok(oids
            .iter()
            .map(|oid| {
                body.varbinds
                    .iter()
                    .find(|vb| vb.oid == *oid)
                    .and_then(|vb| vb.value)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_url_repeats_oid_parameter() {
        let source =
            HttpTelemetrySource::new("http://127.0.0.1:8161/counters", Duration::from_secs(1))
                .unwrap();
        let url = source.query_url(&["sysUpTime.0", "tcpInSegs.0"]);

        assert_eq!(url.path(), "/counters");
        assert_eq!(url.query(), Some("oid=sysUpTime.0&oid=tcpInSegs.0"));
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        assert!(HttpTelemetrySource::new("not a url", Duration::from_secs(1)).is_err());
    }
}
