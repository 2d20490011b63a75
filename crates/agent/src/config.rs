//! Agent configuration

use anyhow::Result;
use assurance_lib::collector::HttpTelemetrySource;
use assurance_lib::prober::HttpStatusSource;
use assurance_lib::scorer::{ForestParams, ScorerConfig};
use assurance_lib::sink::InfluxConfig;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Config file read when `ASSURANCE_CONFIG` is unset
pub const DEFAULT_CONFIG_FILE: &str = "assurance.toml";

/// Agent configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Address the HTTP surface binds to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// HTTP surface port
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Telemetry counter gateway endpoint
    #[serde(default = "default_telemetry_url")]
    pub telemetry_url: String,

    #[serde(default = "default_telemetry_timeout_ms")]
    pub telemetry_timeout_ms: u64,

    /// Device status document endpoint
    #[serde(default = "default_status_url")]
    pub status_url: String,

    #[serde(default = "default_status_timeout_ms")]
    pub status_timeout_ms: u64,

    /// InfluxDB base URL
    #[serde(default = "default_influx_url")]
    pub influx_url: String,

    #[serde(default = "default_influx_database")]
    pub influx_database: String,

    #[serde(default)]
    pub influx_username: Option<String>,

    #[serde(default)]
    pub influx_password: Option<String>,

    #[serde(default = "default_influx_timeout_ms")]
    pub influx_timeout_ms: u64,

    /// Scoring artifact path; empty keeps the model in memory only
    #[serde(default = "default_model_path")]
    pub model_path: String,
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
    5000
}

fn default_telemetry_url() -> String {
    "http://127.0.0.1:8161/counters".to_string()
}

fn default_telemetry_timeout_ms() -> u64 {
    1000
}

fn default_status_url() -> String {
    "http://127.0.0.1:5000/mock-restconf/interface-status".to_string()
}

fn default_status_timeout_ms() -> u64 {
    2000
}

fn default_influx_url() -> String {
    "http://127.0.0.1:8086".to_string()
}

fn default_influx_database() -> String {
    "assurance_metrics".to_string()
}

fn default_influx_timeout_ms() -> u64 {
    2000
}

fn default_model_path() -> String {
    assurance_lib::scorer::DEFAULT_ARTIFACT_PATH.to_string()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            api_port: default_api_port(),
            telemetry_url: default_telemetry_url(),
            telemetry_timeout_ms: default_telemetry_timeout_ms(),
            status_url: default_status_url(),
            status_timeout_ms: default_status_timeout_ms(),
            influx_url: default_influx_url(),
            influx_database: default_influx_database(),
            influx_username: None,
            influx_password: None,
            influx_timeout_ms: default_influx_timeout_ms(),
            model_path: default_model_path(),
        }
    }
}

impl AgentConfig {
    /// Load configuration from environment and config file
    pub fn load() -> Result<Self> {
        let path =
            std::env::var("ASSURANCE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_from(&path)
    }

    /// Load from the given file (optional), overridden by `ASSURANCE_*` variables
    pub fn load_from(path: &str) -> Result<Self> {
        let loaded = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("ASSURANCE").try_parsing(true))
            .build()
            .and_then(|config| config.try_deserialize::<AgentConfig>());

        Ok(loaded.unwrap_or_else(|e| {
            warn!(error = %e, path = %path, "Invalid configuration, using defaults");
            AgentConfig::default()
        }))
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.api_port)
    }

    pub fn telemetry_source(&self) -> Result<HttpTelemetrySource> {
        HttpTelemetrySource::new(
            &self.telemetry_url,
            Duration::from_millis(self.telemetry_timeout_ms),
        )
    }

    pub fn status_source(&self) -> Result<HttpStatusSource> {
        HttpStatusSource::new(
            &self.status_url,
            Duration::from_millis(self.status_timeout_ms),
        )
    }

    pub fn influx_config(&self) -> InfluxConfig {
        InfluxConfig {
            url: self.influx_url.clone(),
            database: self.influx_database.clone(),
            username: self.influx_username.clone(),
            password: self.influx_password.clone(),
            timeout: Duration::from_millis(self.influx_timeout_ms),
        }
    }

    pub fn scorer_config(&self) -> ScorerConfig {
        let artifact_path = match self.model_path.trim() {
            "" => None,
            path => Some(PathBuf::from(path)),
        };

        ScorerConfig {
            artifact_path,
            params: ForestParams::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AgentConfig::default();

        assert_eq!(config.listen_addr(), "127.0.0.1:5000");
        assert_eq!(config.influx_database, "assurance_metrics");
        assert_eq!(
            config.scorer_config().artifact_path,
            Some(PathBuf::from("qos_model.json"))
        );
        assert_eq!(config.influx_config().timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = AgentConfig::load_from("/nonexistent/assurance.toml").unwrap();
        assert_eq!(config.api_port, 5000);
        assert_eq!(config.telemetry_url, "http://127.0.0.1:8161/counters");
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
api_port = 8080
influx_url = "http://influx:8086"
influx_username = "svc"
model_path = ""
"#
        )
        .unwrap();

        let config = AgentConfig::load_from(file.path().to_str().unwrap()).unwrap();

        assert_eq!(config.api_port, 8080);
        assert_eq!(config.bind_address, "127.0.0.1");
        assert_eq!(config.influx_config().url, "http://influx:8086");
        assert_eq!(config.influx_config().username.as_deref(), Some("svc"));
        assert!(config.scorer_config().artifact_path.is_none());
    }

    #[test]
    fn test_unparsable_file_uses_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "api_port = [not toml").unwrap();

        let config = AgentConfig::load_from(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.api_port, 5000);
    }

    #[test]
    fn test_sources_built_from_urls() {
        let config = AgentConfig::default();
        assert!(config.telemetry_source().is_ok());
        assert!(config.status_source().is_ok());

        let broken = AgentConfig {
            telemetry_url: "not a url".to_string(),
            ..AgentConfig::default()
        };
        assert!(broken.telemetry_source().is_err());
    }
}
