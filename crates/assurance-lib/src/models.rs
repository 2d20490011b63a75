//! Core data models for the assurance pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// SLA threshold separating compliant from non-compliant QoS scores
pub const SLA_THRESHOLD: f64 = 85.0;

/// Device status reported when the status source cannot be read
pub const UNKNOWN_STATUS: &str = "UNKNOWN";

/// Where a measurement came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetricSource {
    Live,
    Fallback,
}

/// Latency and packet loss for the monitored service
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NetworkMetrics {
    pub latency_ms: f64,
    pub packet_loss_percent: f64,
    pub source: MetricSource,
}

impl NetworkMetrics {
    pub const FALLBACK_LATENCY_MS: f64 = 5.2;
    pub const FALLBACK_PACKET_LOSS_PERCENT: f64 = 0.1;

    pub fn fallback() -> Self {
        Self {
            latency_ms: Self::FALLBACK_LATENCY_MS,
            packet_loss_percent: Self::FALLBACK_PACKET_LOSS_PERCENT,
            source: MetricSource::Fallback,
        }
    }
}

/// Interface byte counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceStats {
    pub in_octets: u64,
    pub out_octets: u64,
    pub source: MetricSource,
}

impl InterfaceStats {
    pub const FALLBACK_IN_OCTETS: u64 = 1_000_000;
    pub const FALLBACK_OUT_OCTETS: u64 = 900_000;

    pub fn fallback() -> Self {
        Self {
            in_octets: Self::FALLBACK_IN_OCTETS,
            out_octets: Self::FALLBACK_OUT_OCTETS,
            source: MetricSource::Fallback,
        }
    }
}

/// QoS suitability score, always within `[0, 100]` and rounded to 2 decimals
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QosScore(f64);

impl QosScore {
    pub const MIN: f64 = 0.0;
    pub const MAX: f64 = 100.0;

    /// Clamp a raw model output into range and round it to 2 decimal digits
    pub fn new(raw: f64) -> Self {
        let clamped = if raw.is_nan() {
            Self::MIN
        } else {
            raw.clamp(Self::MIN, Self::MAX)
        };
        // `+ 0.0` folds a negative zero into 0.0
        Self((clamped * 100.0).round() / 100.0 + 0.0)
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl fmt::Display for QosScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// SLA verdict for a single pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplianceVerdict {
    Compliant,
    NonCompliant,
}

impl ComplianceVerdict {
    /// `Compliant` iff `score >= threshold`
    pub fn classify(score: QosScore, threshold: f64) -> Self {
        if score.value() >= threshold {
            ComplianceVerdict::Compliant
        } else {
            ComplianceVerdict::NonCompliant
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ComplianceVerdict::Compliant => "COMPLIANT",
            ComplianceVerdict::NonCompliant => "NON_COMPLIANT",
        }
    }

    pub fn is_compliant(&self) -> bool {
        matches!(self, ComplianceVerdict::Compliant)
    }
}

impl fmt::Display for ComplianceVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of writing a data point to the time-series store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PersistenceOutcome {
    Written,
    Failed,
}

/// SLA status as reported; `Unknown` only appears in error reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlaStatus {
    Compliant,
    NonCompliant,
    Unknown,
}

impl From<ComplianceVerdict> for SlaStatus {
    fn from(verdict: ComplianceVerdict) -> Self {
        match verdict {
            ComplianceVerdict::Compliant => SlaStatus::Compliant,
            ComplianceVerdict::NonCompliant => SlaStatus::NonCompliant,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlaCompliance {
    pub status: SlaStatus,
    pub threshold: f64,
    pub qos_score: QosScore,
}

impl SlaCompliance {
    /// SLA block used when no verdict could be produced
    pub fn neutral() -> Self {
        Self {
            status: SlaStatus::Unknown,
            threshold: SLA_THRESHOLD,
            qos_score: QosScore::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceProbe {
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageStatus {
    pub backend: String,
    pub outcome: PersistenceOutcome,
}

/// Scorer metadata carried in every report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    #[serde(rename = "type")]
    pub algorithm: String,
    pub features: Vec<String>,
    pub prediction: QosScore,
}

/// Terminal aggregate of one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceReport {
    pub timestamp: DateTime<Utc>,
    pub status: ReportStatus,
    pub sla_compliance: SlaCompliance,
    pub network_metrics: NetworkMetrics,
    pub interface_stats: InterfaceStats,
    pub device_probe: DeviceProbe,
    pub storage: StorageStatus,
    pub ai_model: ModelInfo,
}

/// Error-shaped document returned when a pipeline run cannot produce a verdict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub timestamp: DateTime<Utc>,
    pub status: ReportStatus,
    pub error_message: String,
    pub sla_compliance: SlaCompliance,
}

impl ErrorReport {
    pub fn new(error_message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            status: ReportStatus::Error,
            error_message: error_message.into(),
            sla_compliance: SlaCompliance::neutral(),
        }
    }
}
