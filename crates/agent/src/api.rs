//! HTTP surface: compliance status, health checks, Prometheus metrics and
//! the mock device status endpoint

use assurance_lib::{
    health::{ComponentStatus, HealthRegistry, ServiceInfo},
    models::ErrorReport,
    observability::AssuranceMetrics,
    pipeline::CompliancePipeline,
};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use prometheus::{Encoder, TextEncoder};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<CompliancePipeline>,
    pub health_registry: HealthRegistry,
    pub metrics: AssuranceMetrics,
    pub version: String,
}

impl AppState {
    pub fn new(
        pipeline: Arc<CompliancePipeline>,
        health_registry: HealthRegistry,
        metrics: AssuranceMetrics,
        version: impl Into<String>,
    ) -> Self {
        Self {
            pipeline,
            health_registry,
            metrics,
            version: version.into(),
        }
    }
}

/// Run the pipeline once - 200 with the report, 500 with the error document
async fn compliance_status(State(state): State<Arc<AppState>>) -> Response {
    match state.pipeline.run_isolated().await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorReport::new(e.to_string())),
        )
            .into_response(),
    }
}

/// Static service document
async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ServiceInfo::healthy(state.version.clone()))
}

/// Component health - 200 if healthy or degraded, 503 if any component is unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
    };

    (status_code, Json(health))
}

/// Readiness check - 503 until bootstrap has finished
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Fixed up-state device document for setups without a real device
async fn mock_interface_status() -> impl IntoResponse {
    Json(json!({
        "restconf_status": "UP",
        "timestamp": Utc::now().to_rfc3339(),
        "interface": "eth0",
        "admin_status": "up",
        "oper_status": "up",
    }))
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/assurance/compliance-status", get(compliance_status))
        .route("/health", get(health))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/mock-restconf/interface-status", get(mock_interface_status))
        .with_state(state)
}

/// Start the API server
pub async fn serve(addr: String, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
