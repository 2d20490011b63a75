//! Assurance agent - telecom service assurance compliance service
//!
//! Serves on-demand SLA compliance reports over HTTP, scoring live link
//! telemetry and persisting every verdict to the time-series store.

use anyhow::Result;
use assurance_agent::{api, config};
use assurance_lib::{
    health::{components, HealthRegistry, SERVICE_NAME},
    observability::{AssuranceMetrics, StructuredLogger},
    pipeline::CompliancePipeline,
    scorer::{QosScorer, ALGORITHM},
    sink::InfluxStore,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting assurance-agent");

    let config = config::AgentConfig::load()?;
    info!(
        listen_addr = %config.listen_addr(),
        telemetry_url = %config.telemetry_url,
        status_url = %config.status_url,
        influx_url = %config.influx_url,
        "Agent configured"
    );

    let health_registry = HealthRegistry::for_pipeline().await;
    let metrics = AssuranceMetrics::new();
    let logger = StructuredLogger::new(SERVICE_NAME);

    let scorer = Arc::new(QosScorer::new(config.scorer_config()));
    let pipeline = Arc::new(
        CompliancePipeline::builder()
            .telemetry(Arc::new(config.telemetry_source()?))
            .status_source(Arc::new(config.status_source()?))
            .store(Arc::new(InfluxStore::new(config.influx_config())))
            .scorer(scorer.clone())
            .health(health_registry.clone())
            .metrics(metrics.clone())
            .logger(logger.clone())
            .build()?,
    );

    // Resolve the scoring model before accepting traffic
    match scorer.ensure_ready().await {
        Ok(origin) => {
            metrics.set_scoring_model(ALGORITHM, origin.as_str());
            logger.log_model_ready(ALGORITHM, origin.as_str());
        }
        Err(e) => {
            logger.log_model_unavailable(&e.to_string());
            health_registry
                .set_unhealthy(components::SCORER, e.to_string())
                .await;
        }
    }

    let listen_addr = config.listen_addr();
    let app_state = Arc::new(api::AppState::new(
        pipeline,
        health_registry.clone(),
        metrics,
        AGENT_VERSION,
    ));

    health_registry.set_ready(true).await;
    logger.log_startup(AGENT_VERSION, &listen_addr);

    let api_handle = tokio::spawn(api::serve(listen_addr, app_state));

    tokio::select! {
        result = api_handle => {
            logger.log_shutdown("API server stopped");
            result??;
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            logger.log_shutdown("SIGINT received");
        }
    }

    info!("Shutting down");
    Ok(())
}
