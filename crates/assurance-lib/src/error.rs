//! Error types for the pipeline collaborators
//!
//! Every collaborator except the scorer converts these into a fallback
//! value locally. Only [`PipelineError`] ever leaves the pipeline.

use thiserror::Error;

/// Failure querying the telemetry source
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("telemetry source unreachable: {0}")]
    Unreachable(String),
    #[error("telemetry query timed out")]
    Timeout,
    #[error("telemetry source returned status {0}")]
    Status(u16),
    #[error("malformed telemetry response: {0}")]
    Malformed(String),
}

/// Failure querying the device status source
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("status source unreachable: {0}")]
    Unreachable(String),
    #[error("status query timed out")]
    Timeout,
    #[error("status source returned status {0}")]
    Status(u16),
    #[error("malformed status response: {0}")]
    Malformed(String),
}

/// Failure writing to the time-series store
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to connect to store: {0}")]
    Connect(String),
    #[error("failed to write point: {0}")]
    Write(String),
    #[error("store rejected point with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("failed to close store connection: {0}")]
    Close(String),
}

/// Failure resolving or running the scoring function
#[derive(Debug, Error)]
pub enum ScorerError {
    #[error("invalid scorer input: latency_ms={latency_ms}, packet_loss_percent={packet_loss_percent}")]
    InvalidInput {
        latency_ms: f64,
        packet_loss_percent: f64,
    },
    #[error("invalid ensemble parameters: {0}")]
    InvalidParams(String),
    #[error("scoring artifact error: {0}")]
    Artifact(String),
}

/// Pipeline-level failure; the only error surfaced to callers
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("scoring function unavailable: {0}")]
    Scorer(#[from] ScorerError),
    #[error("pipeline run aborted: {0}")]
    Aborted(String),
}

impl From<reqwest::Error> for TelemetryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TelemetryError::Timeout
        } else if let Some(status) = err.status() {
            TelemetryError::Status(status.as_u16())
        } else if err.is_decode() {
            TelemetryError::Malformed(err.to_string())
        } else {
            TelemetryError::Unreachable(err.to_string())
        }
    }
}

impl From<reqwest::Error> for ProbeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProbeError::Timeout
        } else if let Some(status) = err.status() {
            ProbeError::Status(status.as_u16())
        } else if err.is_decode() {
            ProbeError::Malformed(err.to_string())
        } else {
            ProbeError::Unreachable(err.to_string())
        }
    }
}
