//! Observability for the assurance agent
//!
//! Provides:
//! - Prometheus metrics (pipeline and prediction latency, last score and
//!   verdict, run outcomes, fallback counts, scoring model info)
//! - Structured event logging with tracing

use crate::models::{ComplianceReport, MetricSource, PersistenceOutcome, SlaStatus, UNKNOWN_STATUS};
use prometheus::{
    register_gauge, register_gauge_vec, register_histogram, register_int_counter_vec, Gauge,
    GaugeVec, Histogram, IntCounterVec,
};
use std::sync::OnceLock;
use tracing::{error, info, warn};

/// Histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
];

static GLOBAL_METRICS: OnceLock<AssuranceMetricsInner> = OnceLock::new();

struct AssuranceMetricsInner {
    pipeline_latency_seconds: Histogram,
    prediction_latency_seconds: Histogram,
    qos_score: Gauge,
    sla_compliant: Gauge,
    pipeline_runs: IntCounterVec,
    fallbacks: IntCounterVec,
    scoring_model_info: GaugeVec,
}

impl AssuranceMetricsInner {
    fn new() -> Self {
        Self {
            pipeline_latency_seconds: register_histogram!(
                "assurance_pipeline_latency_seconds",
                "Time spent producing one compliance report",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register pipeline_latency_seconds"),

            prediction_latency_seconds: register_histogram!(
                "assurance_prediction_latency_seconds",
                "Time spent scoring collected metrics",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            qos_score: register_gauge!(
                "assurance_qos_score",
                "QoS score of the most recent compliance report"
            )
            .expect("Failed to register qos_score"),

            sla_compliant: register_gauge!(
                "assurance_sla_compliant",
                "1 if the most recent report was SLA compliant, 0 otherwise"
            )
            .expect("Failed to register sla_compliant"),

            pipeline_runs: register_int_counter_vec!(
                "assurance_pipeline_runs_total",
                "Pipeline runs by outcome",
                &["outcome"]
            )
            .expect("Failed to register pipeline_runs_total"),

            fallbacks: register_int_counter_vec!(
                "assurance_fallbacks_total",
                "Collaborator results replaced by fallback values",
                &["component"]
            )
            .expect("Failed to register fallbacks_total"),

            scoring_model_info: register_gauge_vec!(
                "assurance_scoring_model_info",
                "Information about the resolved scoring model",
                &["algorithm", "source"]
            )
            .expect("Failed to register scoring_model_info"),
        }
    }
}

/// Handle to the process-wide Prometheus metrics
///
/// Metrics are registered with the default registry on first use. Clones
/// share the same underlying metrics.
#[derive(Clone)]
pub struct AssuranceMetrics {
    _private: (),
}

impl Default for AssuranceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl AssuranceMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(AssuranceMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &AssuranceMetricsInner {
        GLOBAL_METRICS.get_or_init(AssuranceMetricsInner::new)
    }

    pub fn observe_pipeline_latency(&self, duration_secs: f64) {
        self.inner().pipeline_latency_seconds.observe(duration_secs);
    }

    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    /// Record a successful run's score, verdict and fallbacks
    pub fn record_report(&self, report: &ComplianceReport) {
        let inner = self.inner();
        inner.pipeline_runs.with_label_values(&["success"]).inc();
        inner.qos_score.set(report.sla_compliance.qos_score.value());
        inner.sla_compliant.set(
            if report.sla_compliance.status == SlaStatus::Compliant {
                1.0
            } else {
                0.0
            },
        );

        if report.network_metrics.source == MetricSource::Fallback {
            self.inc_fallback("network_metrics");
        }
        if report.interface_stats.source == MetricSource::Fallback {
            self.inc_fallback("interface_stats");
        }
        if report.device_probe.status == UNKNOWN_STATUS {
            self.inc_fallback("device_probe");
        }
        if report.storage.outcome == PersistenceOutcome::Failed {
            self.inc_fallback("storage");
        }
    }

    pub fn record_failure(&self) {
        self.inner().pipeline_runs.with_label_values(&["error"]).inc();
    }

    pub fn inc_fallback(&self, component: &str) {
        self.inner().fallbacks.with_label_values(&[component]).inc();
    }

    pub fn set_scoring_model(&self, algorithm: &str, source: &str) {
        let info = &self.inner().scoring_model_info;
        info.reset();
        info.with_label_values(&[algorithm, source]).set(1.0);
    }
}

/// Structured logger for agent events
///
/// Every event carries an `event` field so log pipelines can filter on it.
#[derive(Clone)]
pub struct StructuredLogger {
    service: String,
}

impl StructuredLogger {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    pub fn log_startup(&self, version: &str, listen_addr: &str) {
        info!(
            event = "agent_started",
            service = %self.service,
            version = %version,
            listen_addr = %listen_addr,
            "Assurance agent started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "agent_shutdown",
            service = %self.service,
            reason = %reason,
            "Assurance agent shutting down"
        );
    }

    pub fn log_report(&self, report: &ComplianceReport, elapsed_ms: u128) {
        info!(
            event = "compliance_report",
            service = %self.service,
            sla_status = ?report.sla_compliance.status,
            qos_score = report.sla_compliance.qos_score.value(),
            latency_ms = report.network_metrics.latency_ms,
            packet_loss_percent = report.network_metrics.packet_loss_percent,
            metrics_source = ?report.network_metrics.source,
            device_status = %report.device_probe.status,
            storage = ?report.storage.outcome,
            elapsed_ms = elapsed_ms as u64,
            "Compliance pipeline complete"
        );
    }

    pub fn log_pipeline_error(&self, message: &str) {
        error!(
            event = "pipeline_failed",
            service = %self.service,
            error = %message,
            "Compliance pipeline failed"
        );
    }

    pub fn log_model_ready(&self, algorithm: &str, source: &str) {
        info!(
            event = "scoring_model_ready",
            service = %self.service,
            algorithm = %algorithm,
            source = %source,
            "Scoring model ready"
        );
    }

    pub fn log_model_unavailable(&self, message: &str) {
        warn!(
            event = "scoring_model_unavailable",
            service = %self.service,
            error = %message,
            "Scoring model could not be resolved"
        );
    }
}
