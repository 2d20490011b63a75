//! Time-series persistence of compliance data points
//!
//! Each pipeline run writes exactly one point. The connection to the store
//! is scoped to a single [`MetricsSink::write`] call and released on every
//! path, including write failure. Errors never propagate: the caller only
//! sees a [`PersistenceOutcome`].

mod influx;
mod point;

pub use influx::{InfluxConfig, InfluxStore};
pub use point::{DataPoint, FieldValue};

use crate::error::SinkError;
use crate::models::{ComplianceVerdict, PersistenceOutcome, QosScore};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Measurement name for compliance points
pub const MEASUREMENT: &str = "assurance_metrics";

/// Service identifier tag value
pub const SERVICE_TAG: &str = "telecom-assurance";

/// A time-series store that hands out write connections
#[async_trait]
pub trait PointStore: Send + Sync {
    /// Short backend name for reports
    fn backend(&self) -> &str;

    async fn connect(&self) -> Result<Box<dyn PointConnection>, SinkError>;
}

/// An open connection to a [`PointStore`]
#[async_trait]
pub trait PointConnection: Send {
    async fn write_point(&mut self, point: &DataPoint) -> Result<(), SinkError>;

    async fn close(self: Box<Self>) -> Result<(), SinkError>;
}

/// Writes compliance points, reporting success or failure without raising
#[derive(Clone)]
pub struct MetricsSink {
    store: Arc<dyn PointStore>,
}

impl MetricsSink {
    pub fn new(store: Arc<dyn PointStore>) -> Self {
        Self { store }
    }

    pub fn backend(&self) -> &str {
        self.store.backend()
    }

    /// Write one compliance point timestamped now
    pub async fn write(
        &self,
        verdict: ComplianceVerdict,
        score: QosScore,
        latency_ms: f64,
        packet_loss_percent: f64,
    ) -> PersistenceOutcome {
        let point = compliance_point(verdict, score, latency_ms, packet_loss_percent);

        let mut connection = match self.store.connect().await {
            Ok(connection) => connection,
            Err(e) => {
                warn!(backend = self.backend(), error = %e, "Failed to open store connection");
                return PersistenceOutcome::Failed;
            }
        };

        let written = connection.write_point(&point).await;
        let closed = connection.close().await;

        match (written, closed) {
            (Ok(()), Ok(())) => {
                debug!(backend = self.backend(), "Compliance point written");
                PersistenceOutcome::Written
            }
            (Err(e), _) => {
                warn!(backend = self.backend(), error = %e, "Failed to write compliance point");
                PersistenceOutcome::Failed
            }
            (Ok(()), Err(e)) => {
                warn!(backend = self.backend(), error = %e, "Failed to close store connection");
                PersistenceOutcome::Failed
            }
        }
    }
}

/// Build the point for one verdict, timestamped at call time
pub fn compliance_point(
    verdict: ComplianceVerdict,
    score: QosScore,
    latency_ms: f64,
    packet_loss_percent: f64,
) -> DataPoint {
    DataPoint::new(MEASUREMENT, chrono::Utc::now().timestamp_micros())
        .tag("service", SERVICE_TAG)
        .tag("sla_status", verdict.as_str())
        .field("qos_score", FieldValue::Float(score.value()))
        .field("latency_ms", FieldValue::Float(latency_ms))
        .field("packet_loss_percent", FieldValue::Float(packet_loss_percent))
        .field(
            "sla_compliant",
            FieldValue::Integer(i64::from(verdict.is_compliant())),
        )
}
