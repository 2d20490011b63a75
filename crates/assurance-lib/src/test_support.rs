//! In-memory collaborators for pipeline tests

use crate::collector::{oids, TelemetrySource};
use crate::error::{ProbeError, SinkError, TelemetryError};
use crate::prober::StatusSource;
use crate::sink::{DataPoint, PointConnection, PointStore};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct FixedTelemetry {
    values: HashMap<&'static str, u64>,
}

impl FixedTelemetry {
    pub fn new(uptime: u64, in_segments: u64, in_octets: u64, out_octets: u64) -> Self {
        Self {
            values: HashMap::from([
                (oids::SYS_UPTIME, uptime),
                (oids::TCP_IN_SEGS, in_segments),
                (oids::IF_IN_OCTETS, in_octets),
                (oids::IF_OUT_OCTETS, out_octets),
            ]),
        }
    }
}

#[async_trait]
impl TelemetrySource for FixedTelemetry {
    async fn get(&self, requested: &[&str]) -> Result<Vec<Option<u64>>, TelemetryError> {
        Ok(requested.iter().map(|oid| self.values.get(*oid).copied()).collect())
    }
}

pub struct DownTelemetry;

#[async_trait]
impl TelemetrySource for DownTelemetry {
    async fn get(&self, _requested: &[&str]) -> Result<Vec<Option<u64>>, TelemetryError> {
        Err(TelemetryError::Unreachable("connection refused".to_string()))
    }
}

pub struct PanickingTelemetry;

#[async_trait]
impl TelemetrySource for PanickingTelemetry {
    async fn get(&self, _requested: &[&str]) -> Result<Vec<Option<u64>>, TelemetryError> {
        panic!("telemetry agent returned impossible data")
    }
}

pub struct FixedStatus(Value);

impl FixedStatus {
    pub fn up() -> Self {
        Self(json!({ "restconf_status": "UP" }))
    }
}

#[async_trait]
impl StatusSource for FixedStatus {
    async fn fetch(&self) -> Result<Value, ProbeError> {
        Ok(self.0.clone())
    }
}

pub struct DownStatus;

#[async_trait]
impl StatusSource for DownStatus {
    async fn fetch(&self) -> Result<Value, ProbeError> {
        Err(ProbeError::Timeout)
    }
}

#[derive(Default)]
pub struct RecordingStore {
    points: Arc<Mutex<Vec<DataPoint>>>,
}

impl RecordingStore {
    pub fn points(&self) -> Vec<DataPoint> {
        self.points.lock().unwrap().clone()
    }
}

#[async_trait]
impl PointStore for RecordingStore {
    fn backend(&self) -> &str {
        "recording"
    }

    async fn connect(&self) -> Result<Box<dyn PointConnection>, SinkError> {
        Ok(Box::new(RecordingConnection {
            points: self.points.clone(),
        }))
    }
}

struct RecordingConnection {
    points: Arc<Mutex<Vec<DataPoint>>>,
}

#[async_trait]
impl PointConnection for RecordingConnection {
    async fn write_point(&mut self, point: &DataPoint) -> Result<(), SinkError> {
        self.points.lock().unwrap().push(point.clone());
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<(), SinkError> {
        Ok(())
    }
}

pub struct DownStore;

#[async_trait]
impl PointStore for DownStore {
    fn backend(&self) -> &str {
        "influxdb"
    }

    async fn connect(&self) -> Result<Box<dyn PointConnection>, SinkError> {
        Err(SinkError::Connect("connection refused".to_string()))
    }
}
