//! QoS scoring
//!
//! Maps (latency, packet loss) to a 0-100 suitability score with a small
//! regression-tree ensemble. The ensemble is resolved lazily on the first
//! prediction (load the persisted artifact, else train on the fixed
//! synthetic set and persist it) and then reused for the lifetime of the
//! [`QosScorer`]. Resolution is single-flight: concurrent first callers
//! wait for one initialisation instead of each training their own.

mod artifact;
mod forest;

pub use artifact::checksum_path;
pub use forest::{ForestParams, RegressionForest, Sample, NUM_FEATURES};

use crate::error::ScorerError;
use crate::models::{ModelInfo, QosScore};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// Algorithm identifier reported alongside every score
pub const ALGORITHM: &str = "RandomForestRegressor";

/// Feature names, in model input order
pub const FEATURE_NAMES: [&str; NUM_FEATURES] = ["latency_ms", "packet_loss_percent"];

/// Default artifact location, relative to the working directory
pub const DEFAULT_ARTIFACT_PATH: &str = "qos_model.json";

/// Fixed synthetic training set: (latency_ms, packet_loss_percent) -> score
pub fn training_set() -> Vec<Sample> {
    const ROWS: [(f64, f64, f64); 10] = [
        (2.0, 0.05, 98.0),
        (3.5, 0.1, 95.0),
        (5.0, 0.15, 92.0),
        (8.0, 0.3, 85.0),
        (12.0, 0.5, 75.0),
        (1.5, 0.02, 99.0),
        (4.0, 0.12, 93.0),
        (10.0, 0.4, 80.0),
        (15.0, 0.8, 70.0),
        (20.0, 1.0, 60.0),
    ];

    ROWS.iter()
        .map(|&(latency, loss, score)| Sample {
            features: [latency, loss],
            target: score,
        })
        .collect()
}

/// Scorer configuration
#[derive(Debug, Clone)]
pub struct ScorerConfig {
    /// Where the artifact is read from and written to; `None` keeps it in memory
    pub artifact_path: Option<PathBuf>,
    pub params: ForestParams,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            artifact_path: Some(PathBuf::from(DEFAULT_ARTIFACT_PATH)),
            params: ForestParams::default(),
        }
    }
}

impl ScorerConfig {
    pub fn in_memory() -> Self {
        Self {
            artifact_path: None,
            params: ForestParams::default(),
        }
    }
}

/// How the scoring function was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelOrigin {
    Loaded,
    Trained,
}

impl ModelOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelOrigin::Loaded => "loaded",
            ModelOrigin::Trained => "trained",
        }
    }
}

struct ScoringModel {
    forest: RegressionForest,
    origin: ModelOrigin,
}

/// Scorer statistics
#[derive(Debug, Clone, Default)]
pub struct ScorerStats {
    pub trainings: u64,
    pub loads: u64,
    pub predictions: u64,
}

/// QoS scorer owning the lazily resolved scoring function
pub struct QosScorer {
    config: ScorerConfig,
    model: OnceCell<ScoringModel>,
    trainings: AtomicU64,
    loads: AtomicU64,
    predictions: AtomicU64,
}

impl QosScorer {
    pub fn new(config: ScorerConfig) -> Self {
        Self {
            config,
            model: OnceCell::new(),
            trainings: AtomicU64::new(0),
            loads: AtomicU64::new(0),
            predictions: AtomicU64::new(0),
        }
    }

    /// Resolve the scoring function if that has not happened yet
    pub async fn ensure_ready(&self) -> Result<ModelOrigin, ScorerError> {
        Ok(self.model().await?.origin)
    }

    /// Origin of the resolved scoring function, if resolved
    pub fn origin(&self) -> Option<ModelOrigin> {
        self.model.get().map(|m| m.origin)
    }

    /// Score a (latency, packet loss) pair
    pub async fn predict(
        &self,
        latency_ms: f64,
        packet_loss_percent: f64,
    ) -> Result<QosScore, ScorerError> {
        if !is_valid_input(latency_ms) || !is_valid_input(packet_loss_percent) {
            return Err(ScorerError::InvalidInput {
                latency_ms,
                packet_loss_percent,
            });
        }

        let model = self.model().await?;
        let start = Instant::now();
        let raw = model.forest.predict(&[latency_ms, packet_loss_percent]);
        self.predictions.fetch_add(1, Ordering::Relaxed);

        let score = QosScore::new(raw);
        debug!(
            latency_ms,
            packet_loss_percent,
            raw,
            score = score.value(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "QoS prediction completed"
        );
        Ok(score)
    }

    /// Scorer metadata for a report
    pub fn model_info(&self, prediction: QosScore) -> ModelInfo {
        ModelInfo {
            algorithm: ALGORITHM.to_string(),
            features: FEATURE_NAMES.iter().map(|f| f.to_string()).collect(),
            prediction,
        }
    }

    pub fn stats(&self) -> ScorerStats {
        ScorerStats {
            trainings: self.trainings.load(Ordering::Relaxed),
            loads: self.loads.load(Ordering::Relaxed),
            predictions: self.predictions.load(Ordering::Relaxed),
        }
    }

    async fn model(&self) -> Result<&ScoringModel, ScorerError> {
        self.model.get_or_try_init(|| self.resolve()).await
    }

    async fn resolve(&self) -> Result<ScoringModel, ScorerError> {
        if let Some(path) = &self.config.artifact_path {
            match artifact::load(path).await {
                Ok(Some(forest)) if forest.params() == self.config.params => {
                    self.loads.fetch_add(1, Ordering::Relaxed);
                    info!(
                        path = %path.display(),
                        trees = forest.n_trees(),
                        "Scoring model loaded"
                    );
                    return Ok(ScoringModel {
                        forest,
                        origin: ModelOrigin::Loaded,
                    });
                }
                Ok(Some(_)) => {
                    warn!(
                        path = %path.display(),
                        "Scoring artifact built with different parameters, retraining"
                    );
                }
                Ok(None) => {
                    info!(path = %path.display(), "Scoring model not found, training new model");
                }
                Err(e) => {
                    warn!(error = %e, "Discarding unusable scoring artifact, retraining");
                }
            }
        }

        let forest = RegressionForest::fit(&training_set(), self.config.params)?;
        self.trainings.fetch_add(1, Ordering::Relaxed);

        if let Some(path) = &self.config.artifact_path {
            match artifact::save(path, &forest).await {
                Ok(()) => info!(path = %path.display(), "Scoring model trained and saved"),
                Err(e) => warn!(error = %e, "Scoring model trained but not persisted"),
            }
        } else {
            info!("Scoring model trained in memory");
        }

        Ok(ScoringModel {
            forest,
            origin: ModelOrigin::Trained,
        })
    }
}

fn is_valid_input(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ComplianceVerdict, SLA_THRESHOLD};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn scorer_at(dir: &TempDir) -> QosScorer {
        QosScorer::new(ScorerConfig {
            artifact_path: Some(dir.path().join("qos_model.json")),
            params: ForestParams::default(),
        })
    }

    #[tokio::test]
    async fn test_low_latency_scenario_is_compliant() {
        let scorer = QosScorer::new(ScorerConfig::in_memory());
        let score = scorer.predict(2.0, 0.05).await.unwrap();

        assert!((95.0..=100.0).contains(&score.value()), "score {}", score);
        assert_eq!(
            ComplianceVerdict::classify(score, SLA_THRESHOLD),
            ComplianceVerdict::Compliant
        );
    }

    #[tokio::test]
    async fn test_high_latency_scenario_is_non_compliant() {
        let scorer = QosScorer::new(ScorerConfig::in_memory());
        let score = scorer.predict(20.0, 1.0).await.unwrap();

        assert!((62.0..=68.0).contains(&score.value()), "score {}", score);
        assert_eq!(
            ComplianceVerdict::classify(score, SLA_THRESHOLD),
            ComplianceVerdict::NonCompliant
        );
    }

    #[tokio::test]
    async fn test_scores_always_in_range() {
        let scorer = QosScorer::new(ScorerConfig::in_memory());
        for latency in [0.0, 0.5, 2.0, 7.5, 20.0, 250.0, 1e9] {
            for loss in [0.0, 0.01, 0.5, 1.0, 50.0, 100.0] {
                let score = scorer.predict(latency, loss).await.unwrap().value();
                assert!((0.0..=100.0).contains(&score), "({}, {}) -> {}", latency, loss, score);
                assert_eq!((score * 100.0).round() / 100.0, score);
            }
        }
    }

    #[tokio::test]
    async fn test_repeated_predictions_identical() {
        let scorer = QosScorer::new(ScorerConfig::in_memory());
        let first = scorer.predict(6.3, 0.21).await.unwrap();
        let second = scorer.predict(6.3, 0.21).await.unwrap();
        assert_eq!(first, second);

        let other = QosScorer::new(ScorerConfig::in_memory());
        assert_eq!(other.predict(6.3, 0.21).await.unwrap(), first);
    }

    #[tokio::test]
    async fn test_lazy_resolution_happens_once() {
        let scorer = QosScorer::new(ScorerConfig::in_memory());
        assert!(scorer.origin().is_none());

        scorer.predict(5.0, 0.15).await.unwrap();
        scorer.predict(8.0, 0.3).await.unwrap();

        let stats = scorer.stats();
        assert_eq!(stats.trainings, 1);
        assert_eq!(stats.loads, 0);
        assert_eq!(stats.predictions, 2);
        assert_eq!(scorer.origin(), Some(ModelOrigin::Trained));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_use_trains_once() {
        let dir = TempDir::new().unwrap();
        let scorer = Arc::new(scorer_at(&dir));

        let handles: Vec<_> = (0..32)
            .map(|i| {
                let scorer = scorer.clone();
                tokio::spawn(async move { scorer.predict(1.0 + i as f64 * 0.5, 0.1).await })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let stats = scorer.stats();
        assert_eq!(stats.trainings, 1);
        assert_eq!(stats.predictions, 32);
    }

    #[tokio::test]
    async fn test_trained_artifact_is_reused() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("qos_model.json");

        let first = scorer_at(&dir);
        let trained_score = first.predict(9.0, 0.35).await.unwrap();
        assert_eq!(first.origin(), Some(ModelOrigin::Trained));
        assert!(path.exists());
        assert!(checksum_path(&path).exists());

        let second = scorer_at(&dir);
        let loaded_score = second.predict(9.0, 0.35).await.unwrap();
        assert_eq!(second.origin(), Some(ModelOrigin::Loaded));
        assert_eq!(second.stats().trainings, 0);
        assert_eq!(second.stats().loads, 1);
        assert_eq!(loaded_score, trained_score);
    }

    #[tokio::test]
    async fn test_corrupt_artifact_triggers_retraining() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("qos_model.json");
        std::fs::write(&path, b"not a model").unwrap();
        std::fs::write(checksum_path(&path), b"deadbeef").unwrap();

        let scorer = scorer_at(&dir);
        scorer.predict(3.0, 0.1).await.unwrap();

        assert_eq!(scorer.origin(), Some(ModelOrigin::Trained));
        assert_eq!(scorer.stats().trainings, 1);
    }

    #[tokio::test]
    async fn test_malformed_artifact_with_valid_checksum_triggers_retraining() {
        use sha2::{Digest, Sha256};

        let artifacts: [&[u8]; 2] = [
            br#"{"params":{"n_estimators":10,"max_depth":5,"seed":42},"trees":[
                {"kind":"split","feature":7,"threshold":1.0,
                 "left":{"kind":"leaf","value":90.0},"right":{"kind":"leaf","value":60.0}}]}"#,
            br#"{"params":{"n_estimators":10,"max_depth":5,"seed":42},"trees":[]}"#,
        ];

        for bytes in artifacts {
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("qos_model.json");
            std::fs::write(&path, bytes).unwrap();
            std::fs::write(checksum_path(&path), hex::encode(Sha256::digest(bytes))).unwrap();

            let scorer = scorer_at(&dir);
            assert_eq!(scorer.ensure_ready().await.unwrap(), ModelOrigin::Trained);

            let score = scorer.predict(2.0, 0.05).await.unwrap();
            assert!(score.value() > 90.0, "score {}", score);
            assert_eq!(scorer.stats().loads, 0);
            assert_eq!(scorer.stats().trainings, 1);
        }
    }

    #[tokio::test]
    async fn test_unwritable_artifact_path_still_predicts() {
        let dir = TempDir::new().unwrap();
        let scorer = QosScorer::new(ScorerConfig {
            artifact_path: Some(dir.path().join("missing-dir").join("qos_model.json")),
            params: ForestParams::default(),
        });

        let score = scorer.predict(2.0, 0.05).await.unwrap();
        assert!(score.value() > 85.0);
        assert_eq!(scorer.origin(), Some(ModelOrigin::Trained));
    }

    #[tokio::test]
    async fn test_invalid_input_rejected() {
        let scorer = QosScorer::new(ScorerConfig::in_memory());

        assert!(matches!(
            scorer.predict(f64::NAN, 0.1).await,
            Err(ScorerError::InvalidInput { .. })
        ));
        assert!(matches!(
            scorer.predict(5.0, -0.1).await,
            Err(ScorerError::InvalidInput { .. })
        ));
        assert_eq!(scorer.stats().predictions, 0);
    }

    #[tokio::test]
    async fn test_untrainable_params_fail_every_call() {
        let scorer = QosScorer::new(ScorerConfig {
            artifact_path: None,
            params: ForestParams {
                n_estimators: 0,
                ..ForestParams::default()
            },
        });

        assert!(matches!(
            scorer.predict(5.0, 0.15).await,
            Err(ScorerError::InvalidParams(_))
        ));
        assert!(scorer.ensure_ready().await.is_err());
        assert!(scorer.origin().is_none());
    }

    #[test]
    fn test_model_info() {
        let scorer = QosScorer::new(ScorerConfig::in_memory());
        let info = scorer.model_info(QosScore::new(91.5));

        assert_eq!(info.algorithm, "RandomForestRegressor");
        assert_eq!(info.features, vec!["latency_ms", "packet_loss_percent"]);
        assert_eq!(info.prediction.value(), 91.5);
    }
}
