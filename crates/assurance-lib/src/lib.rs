//! Service assurance library for telecom network links
//!
//! This crate provides the core functionality for:
//! - Telemetry collection with fallback substitution
//! - QoS scoring with a lazily resolved regression ensemble
//! - SLA classification and time-series persistence
//! - The compliance pipeline tying them together
//! - Health checks and observability

pub mod collector;
pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod pipeline;
pub mod prober;
pub mod scorer;
pub mod sink;

#[cfg(test)]
mod test_support;

pub use error::{PipelineError, ScorerError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
    ServiceInfo,
};
pub use models::*;
pub use observability::{AssuranceMetrics, StructuredLogger};
pub use pipeline::{CompliancePipeline, CompliancePipelineBuilder};
