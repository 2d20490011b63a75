//! InfluxDB 1.x HTTP write API store

use super::{DataPoint, PointConnection, PointStore};
use crate::error::SinkError;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Connection settings for an InfluxDB instance
#[derive(Debug, Clone)]
pub struct InfluxConfig {
    pub url: String,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout: Duration,
}

impl Default for InfluxConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8086".to_string(),
            database: "assurance_metrics".to_string(),
            username: None,
            password: None,
            timeout: Duration::from_secs(2),
        }
    }
}

/// Store writing line protocol to `POST /write?db=<db>&precision=u`
pub struct InfluxStore {
    config: InfluxConfig,
}

impl InfluxStore {
    pub fn new(config: InfluxConfig) -> Self {
        Self { config }
    }

    fn write_url(&self) -> Result<Url, SinkError> {
        let mut url = Url::parse(&self.config.url)
            .and_then(|base| base.join("write"))
            .map_err(|e| {
                SinkError::Connect(format!("invalid InfluxDB URL {}: {}", self.config.url, e))
            })?;
        url.query_pairs_mut()
            .append_pair("db", &self.config.database)
            .append_pair("precision", "u");
        Ok(url)
    }
}

#[async_trait]
impl PointStore for InfluxStore {
    fn backend(&self) -> &str {
        "influxdb"
    }

    async fn connect(&self) -> Result<Box<dyn PointConnection>, SinkError> {
        let write_url = self.write_url()?;
        let client = Client::builder()
            .timeout(self.config.timeout)
            .build()
            .map_err(|e| SinkError::Connect(e.to_string()))?;

        Ok(Box::new(InfluxConnection {
            client,
            write_url,
            credentials: self
                .config
                .username
                .clone()
                .map(|user| (user, self.config.password.clone())),
        }))
    }
}

struct InfluxConnection {
    client: Client,
    write_url: Url,
    credentials: Option<(String, Option<String>)>,
}

#[async_trait]
impl PointConnection for InfluxConnection {
    async fn write_point(&mut self, point: &DataPoint) -> Result<(), SinkError> {
        let mut request = self
            .client
            .post(self.write_url.clone())
            .body(point.to_line_protocol());
        if let Some((user, password)) = &self.credentials {
            request = request.basic_auth(user, password.as_ref());
        }

        let response = request
            .send()
            .await
            .map_err(|e| SinkError::Write(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SinkError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<(), SinkError> {
        // The HTTP client holds no server-side session; dropping it releases the pool.
        drop(self);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ComplianceVerdict, PersistenceOutcome, QosScore};
    use crate::sink::MetricsSink;
    use mockito::Matcher;
    use std::sync::Arc;

    fn sink_for(url: String) -> MetricsSink {
        MetricsSink::new(Arc::new(InfluxStore::new(InfluxConfig {
            url,
            timeout: Duration::from_millis(500),
            ..InfluxConfig::default()
        })))
    }

    #[test]
    fn test_write_url() {
        let store = InfluxStore::new(InfluxConfig::default());
        let url = store.write_url().unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:8086/write?db=assurance_metrics&precision=u"
        );
    }

    #[tokio::test]
    async fn test_point_written() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/write")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("db".into(), "assurance_metrics".into()),
                Matcher::UrlEncoded("precision".into(), "u".into()),
            ]))
            .match_body(Matcher::Regex(
                r"^assurance_metrics,service=telecom-assurance,sla_status=COMPLIANT latency_ms=5\.2,packet_loss_percent=0\.1,qos_score=92\.5,sla_compliant=1i \d+$".to_string(),
            ))
            .with_status(204)
            .create_async()
            .await;

        let outcome = sink_for(server.url())
            .write(ComplianceVerdict::Compliant, QosScore::new(92.5), 5.2, 0.1)
            .await;

        mock.assert_async().await;
        assert_eq!(outcome, PersistenceOutcome::Written);
    }

    #[tokio::test]
    async fn test_rejected_point_fails() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/write")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body(r#"{"error":"database not found: \"assurance_metrics\""}"#)
            .create_async()
            .await;

        let outcome = sink_for(server.url())
            .write(ComplianceVerdict::Compliant, QosScore::new(92.5), 5.2, 0.1)
            .await;

        assert_eq!(outcome, PersistenceOutcome::Failed);
    }

    #[tokio::test]
    async fn test_unreachable_store_fails() {
        let outcome = sink_for("http://127.0.0.1:1".to_string())
            .write(ComplianceVerdict::NonCompliant, QosScore::new(60.0), 20.0, 1.0)
            .await;

        assert_eq!(outcome, PersistenceOutcome::Failed);
    }
}
