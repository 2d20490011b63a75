//! Compliance pipeline
//!
//! Sequences one compliance run:
//!
//! 1. warm-up: resolve the scoring function with a sentinel prediction
//! 2. collect: network metrics, then interface stats
//! 3. probe: device status
//! 4. score: QoS score of the collected metrics
//! 5. classify: SLA verdict against the threshold
//! 6. persist: one data point to the time-series store
//! 7. assemble: the immutable [`ComplianceReport`]
//!
//! Collaborators degrade to fallback values on their own. The only error a
//! run can produce is a scorer that cannot be resolved or used, or a panic
//! caught by [`CompliancePipeline::run_isolated`].

use crate::collector::{TelemetryCollector, TelemetrySource};
use crate::error::PipelineError;
use crate::health::{components, HealthRegistry, SERVICE_NAME};
use crate::models::{
    ComplianceReport, ComplianceVerdict, DeviceProbe, InterfaceStats, MetricSource,
    NetworkMetrics, PersistenceOutcome, ReportStatus, SlaCompliance, StorageStatus,
    SLA_THRESHOLD, UNKNOWN_STATUS,
};
use crate::observability::{AssuranceMetrics, StructuredLogger};
use crate::prober::{DeviceProber, StatusSource};
use crate::scorer::{ModelOrigin, QosScorer, ALGORITHM};
use crate::sink::{MetricsSink, PointStore};
use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Sentinel input used to force scorer resolution before the timed run
pub const WARMUP_INPUT: (f64, f64) = (5.0, 0.15);

/// Orchestrates collect → predict → classify → persist → report
pub struct CompliancePipeline {
    collector: TelemetryCollector,
    scorer: Arc<QosScorer>,
    prober: DeviceProber,
    sink: MetricsSink,
    health: HealthRegistry,
    metrics: AssuranceMetrics,
    logger: StructuredLogger,
}

impl CompliancePipeline {
    pub fn builder() -> CompliancePipelineBuilder {
        CompliancePipelineBuilder::new()
    }

    pub fn scorer(&self) -> &Arc<QosScorer> {
        &self.scorer
    }

    pub fn health(&self) -> &HealthRegistry {
        &self.health
    }

    /// Produce one compliance report
    pub async fn run(&self) -> Result<ComplianceReport, PipelineError> {
        let start = Instant::now();

        match self.execute().await {
            Ok(report) => {
                let elapsed = start.elapsed();
                self.metrics.observe_pipeline_latency(elapsed.as_secs_f64());
                self.metrics.record_report(&report);
                self.logger.log_report(&report, elapsed.as_millis());
                Ok(report)
            }
            Err(e) => {
                self.metrics.record_failure();
                self.logger.log_pipeline_error(&e.to_string());
                Err(e)
            }
        }
    }

    /// Produce one report on a dedicated task, converting a panic into
    /// [`PipelineError::Aborted`] instead of taking the caller down
    pub async fn run_isolated(self: &Arc<Self>) -> Result<ComplianceReport, PipelineError> {
        let pipeline = Arc::clone(self);

        match tokio::spawn(async move { pipeline.run().await }).await {
            Ok(result) => result,
            Err(join_error) => {
                let message = if join_error.is_panic() {
                    "unexpected internal error during compliance run".to_string()
                } else {
                    format!("compliance run cancelled: {}", join_error)
                };
                self.metrics.record_failure();
                self.logger.log_pipeline_error(&message);
                Err(PipelineError::Aborted(message))
            }
        }
    }

    async fn execute(&self) -> Result<ComplianceReport, PipelineError> {
        let origin = self.warm_up().await?;

        let network_metrics = self.collector.fetch_metrics().await;
        let interface_stats = self.collector.fetch_interface_stats().await;

        let device_status = self.prober.probe_status().await;

        let predict_start = Instant::now();
        let score = match self
            .scorer
            .predict(network_metrics.latency_ms, network_metrics.packet_loss_percent)
            .await
        {
            Ok(score) => score,
            Err(e) => {
                self.health
                    .set_unhealthy(components::SCORER, e.to_string())
                    .await;
                return Err(e.into());
            }
        };
        self.metrics
            .observe_prediction_latency(predict_start.elapsed().as_secs_f64());

        let verdict = ComplianceVerdict::classify(score, SLA_THRESHOLD);
        debug!(
            qos_score = score.value(),
            verdict = %verdict,
            threshold = SLA_THRESHOLD,
            model = origin.as_str(),
            "SLA verdict derived"
        );

        let outcome = self
            .sink
            .write(
                verdict,
                score,
                network_metrics.latency_ms,
                network_metrics.packet_loss_percent,
            )
            .await;

        self.record_health(&network_metrics, &interface_stats, &device_status, outcome)
            .await;

        Ok(ComplianceReport {
            timestamp: Utc::now(),
            status: ReportStatus::Success,
            sla_compliance: SlaCompliance {
                status: verdict.into(),
                threshold: SLA_THRESHOLD,
                qos_score: score,
            },
            network_metrics,
            interface_stats,
            device_probe: DeviceProbe {
                status: device_status,
            },
            storage: StorageStatus {
                backend: self.sink.backend().to_string(),
                outcome,
            },
            ai_model: self.scorer.model_info(score),
        })
    }

    async fn warm_up(&self) -> Result<ModelOrigin, PipelineError> {
        let first_use = self.scorer.origin().is_none();
        let (latency, loss) = WARMUP_INPUT;

        match self.scorer.predict(latency, loss).await {
            Ok(sample) => {
                let origin = self.scorer.origin().unwrap_or(ModelOrigin::Trained);
                if first_use {
                    self.metrics.set_scoring_model(ALGORITHM, origin.as_str());
                    self.logger.log_model_ready(ALGORITHM, origin.as_str());
                }
                debug!(sample_score = sample.value(), "Scoring model warm");
                self.health.set_healthy(components::SCORER).await;
                Ok(origin)
            }
            Err(e) => {
                self.logger.log_model_unavailable(&e.to_string());
                self.health
                    .set_unhealthy(components::SCORER, e.to_string())
                    .await;
                Err(e.into())
            }
        }
    }

    async fn record_health(
        &self,
        network_metrics: &NetworkMetrics,
        interface_stats: &InterfaceStats,
        device_status: &str,
        outcome: PersistenceOutcome,
    ) {
        let telemetry_fallback = network_metrics.source == MetricSource::Fallback
            || interface_stats.source == MetricSource::Fallback;

        self.health
            .record_fallback(
                components::TELEMETRY,
                telemetry_fallback,
                "Telemetry source unavailable, reporting fallback values",
            )
            .await;
        self.health
            .record_fallback(
                components::DEVICE_PROBE,
                device_status == UNKNOWN_STATUS,
                "Device status unavailable",
            )
            .await;
        self.health
            .record_fallback(
                components::STORAGE,
                outcome == PersistenceOutcome::Failed,
                "Compliance point not persisted",
            )
            .await;
    }
}

/// Builder wiring the pipeline's collaborators
pub struct CompliancePipelineBuilder {
    telemetry: Option<Arc<dyn TelemetrySource>>,
    status_source: Option<Arc<dyn StatusSource>>,
    store: Option<Arc<dyn PointStore>>,
    scorer: Option<Arc<QosScorer>>,
    health: Option<HealthRegistry>,
    metrics: Option<AssuranceMetrics>,
    logger: Option<StructuredLogger>,
}

impl CompliancePipelineBuilder {
    pub fn new() -> Self {
        Self {
            telemetry: None,
            status_source: None,
            store: None,
            scorer: None,
            health: None,
            metrics: None,
            logger: None,
        }
    }

    pub fn telemetry(mut self, source: Arc<dyn TelemetrySource>) -> Self {
        self.telemetry = Some(source);
        self
    }

    pub fn status_source(mut self, source: Arc<dyn StatusSource>) -> Self {
        self.status_source = Some(source);
        self
    }

    pub fn store(mut self, store: Arc<dyn PointStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn scorer(mut self, scorer: Arc<QosScorer>) -> Self {
        self.scorer = Some(scorer);
        self
    }

    pub fn health(mut self, health: HealthRegistry) -> Self {
        self.health = Some(health);
        self
    }

    pub fn metrics(mut self, metrics: AssuranceMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn build(self) -> Result<CompliancePipeline> {
        let telemetry = self
            .telemetry
            .ok_or_else(|| anyhow::anyhow!("Telemetry source is required"))?;
        let status_source = self
            .status_source
            .ok_or_else(|| anyhow::anyhow!("Status source is required"))?;
        let store = self
            .store
            .ok_or_else(|| anyhow::anyhow!("Point store is required"))?;
        let scorer = self
            .scorer
            .ok_or_else(|| anyhow::anyhow!("QoS scorer is required"))?;

        Ok(CompliancePipeline {
            collector: TelemetryCollector::new(telemetry),
            scorer,
            prober: DeviceProber::new(status_source),
            sink: MetricsSink::new(store),
            health: self.health.unwrap_or_default(),
            metrics: self.metrics.unwrap_or_default(),
            logger: self
                .logger
                .unwrap_or_else(|| StructuredLogger::new(SERVICE_NAME)),
        })
    }
}

impl Default for CompliancePipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
