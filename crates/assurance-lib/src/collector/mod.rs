//! Network telemetry collection
//!
//! Queries a telemetry source for the counters the QoS model consumes and
//! derives latency and packet loss from them. Collection never fails
//! outward: any source error is replaced by the documented fallback values
//! and surfaced only through the `source` field of the result.

mod telemetry;


pub use telemetry::HttpTelemetrySource;

use crate::error::TelemetryError;
use crate::models::{InterfaceStats, MetricSource, NetworkMetrics};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Counter identifiers queried from the telemetry source
pub mod oids {
    pub const SYS_UPTIME: &str = "sysUpTime.0";
    pub const TCP_IN_SEGS: &str = "tcpInSegs.0";
    pub const IF_IN_OCTETS: &str = "ifInOctets.1";
    pub const IF_OUT_OCTETS: &str = "ifOutOctets.1";
}

/// Segment count assumed when the source omits `tcpInSegs.0`
pub const DEFAULT_TCP_IN_SEGS: u64 = 10_000;

/// A queryable source of scalar counters
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    /// Fetch the given counters in one request.
    ///
    /// The returned vector is aligned with `oids`; `None` marks a counter the
    /// source did not report.
    async fn get(&self, oids: &[&str]) -> Result<Vec<Option<u64>>, TelemetryError>;
}

/// Collects network metrics and interface counters with fallback substitution
#[derive(Clone)]
pub struct TelemetryCollector {
    source: Arc<dyn TelemetrySource>,
}

impl TelemetryCollector {
    pub fn new(source: Arc<dyn TelemetrySource>) -> Self {
        Self { source }
    }

    /// Latency and packet loss, or the fallback values if the source fails
    pub async fn fetch_metrics(&self) -> NetworkMetrics {
        match self.query_metrics().await {
            Ok(metrics) => {
                debug!(
                    latency_ms = metrics.latency_ms,
                    packet_loss_percent = metrics.packet_loss_percent,
                    "Collected live network metrics"
                );
                metrics
            }
            Err(e) => {
                warn!(error = %e, "Telemetry query failed, using fallback metrics");
                NetworkMetrics::fallback()
            }
        }
    }

    /// Interface octet counters, or the fallback values if the source fails
    pub async fn fetch_interface_stats(&self) -> InterfaceStats {
        match self.query_interface_stats().await {
            Ok(stats) => stats,
            Err(e) => {
                warn!(error = %e, "Interface counter query failed, using fallback stats");
                InterfaceStats::fallback()
            }
        }
    }

    async fn query_metrics(&self) -> Result<NetworkMetrics, TelemetryError> {
        let values = self
            .source
            .get(&[oids::SYS_UPTIME, oids::TCP_IN_SEGS])
            .await?;

        let uptime = counter(&values, 0)
            .ok_or_else(|| TelemetryError::Malformed(format!("missing {}", oids::SYS_UPTIME)))?;
        let segments = counter(&values, 1).unwrap_or(DEFAULT_TCP_IN_SEGS);

        Ok(derive_network_metrics(uptime, segments))
    }

    async fn query_interface_stats(&self) -> Result<InterfaceStats, TelemetryError> {
        let values = self
            .source
            .get(&[oids::IF_IN_OCTETS, oids::IF_OUT_OCTETS])
            .await?;

        let in_octets = counter(&values, 0)
            .ok_or_else(|| TelemetryError::Malformed(format!("missing {}", oids::IF_IN_OCTETS)))?;
        let out_octets = counter(&values, 1)
            .ok_or_else(|| TelemetryError::Malformed(format!("missing {}", oids::IF_OUT_OCTETS)))?;

        Ok(InterfaceStats {
            in_octets,
            out_octets,
            source: MetricSource::Live,
        })
    }
}

fn counter(values: &[Option<u64>], index: usize) -> Option<u64> {
    values.get(index).copied().flatten()
}

/// Derive latency and packet loss from raw uptime and segment counters.
///
/// latency = 5.0 + (uptime mod 100) / 10.0, rounded to 2 decimals
/// packet_loss = 0.01 + (segments mod 50) / 10000.0, rounded to 3 decimals
pub fn derive_network_metrics(uptime_ticks: u64, tcp_in_segments: u64) -> NetworkMetrics {
    let latency = 5.0 + (uptime_ticks % 100) as f64 / 10.0;
    let packet_loss = 0.01 + (tcp_in_segments % 50) as f64 / 10_000.0;

    NetworkMetrics {
        latency_ms: round_to(latency, 2),
        packet_loss_percent: round_to(packet_loss, 3),
        source: MetricSource::Live,
    }
}

fn round_to(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    (value * factor).round() / factor
}
