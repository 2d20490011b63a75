//! Bagged regression-tree ensemble
//!
//! A small random-forest regressor: each tree is fitted on a bootstrap
//! sample drawn from a seeded RNG, splits minimise the summed squared error
//! of the children, and the ensemble prediction is the mean over trees.
//! With the same parameters and training data, fitting always yields the
//! same forest.

use crate::error::ScorerError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Number of input features: latency_ms, packet_loss_percent
pub const NUM_FEATURES: usize = 2;

/// One training example
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub features: [f64; NUM_FEATURES],
    pub target: f64,
}

/// Ensemble hyper-parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 10,
            max_depth: 5,
            seed: 42,
        }
    }
}

impl ForestParams {
    pub fn validate(&self) -> Result<(), ScorerError> {
        if self.n_estimators == 0 {
            return Err(ScorerError::InvalidParams(
                "n_estimators must be at least 1".to_string(),
            ));
        }
        if self.max_depth == 0 {
            return Err(ScorerError::InvalidParams(
                "max_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn predict(&self, features: &[f64; NUM_FEATURES]) -> f64 {
        let mut node = self;
        loop {
            match node {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    // `validate` rejects out-of-range features; route left regardless
                    let goes_left = features
                        .get(*feature)
                        .map_or(true, |value| *value <= *threshold);
                    node = if goes_left { left } else { right };
                }
            }
        }
    }

    fn validate(&self) -> Result<(), String> {
        match self {
            Node::Leaf { value } if !value.is_finite() => {
                Err(format!("leaf value {} is not finite", value))
            }
            Node::Leaf { .. } => Ok(()),
            Node::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if *feature >= NUM_FEATURES {
                    return Err(format!(
                        "split on feature {} but only {} features exist",
                        feature, NUM_FEATURES
                    ));
                }
                if !threshold.is_finite() {
                    return Err(format!("split threshold {} is not finite", threshold));
                }
                left.validate()?;
                right.validate()
            }
        }
    }
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    error: f64,
}

/// Fitted ensemble
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionForest {
    params: ForestParams,
    trees: Vec<Node>,
}

impl RegressionForest {
    /// Fit a forest on `samples`
    pub fn fit(samples: &[Sample], params: ForestParams) -> Result<Self, ScorerError> {
        params.validate()?;
        if samples.is_empty() {
            return Err(ScorerError::InvalidParams(
                "training set is empty".to_string(),
            ));
        }

        let mut rng = StdRng::seed_from_u64(params.seed);
        let trees = (0..params.n_estimators)
            .map(|_| {
                let bootstrap: Vec<Sample> = (0..samples.len())
                    .map(|_| samples[rng.gen_range(0..samples.len())])
                    .collect();
                build_node(&bootstrap, 0, params.max_depth)
            })
            .collect();

        Ok(Self { params, trees })
    }

    /// Mean prediction over all trees
    pub fn predict(&self, features: &[f64; NUM_FEATURES]) -> f64 {
        let sum: f64 = self.trees.iter().map(|tree| tree.predict(features)).sum();
        sum / self.trees.len().max(1) as f64
    }

    /// Structural check for a forest decoded from outside this process
    pub fn validate(&self) -> Result<(), ScorerError> {
        self.params.validate()?;
        if self.trees.len() != self.params.n_estimators {
            return Err(ScorerError::Artifact(format!(
                "expected {} trees, found {}",
                self.params.n_estimators,
                self.trees.len()
            )));
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate()
                .map_err(|e| ScorerError::Artifact(format!("tree {}: {}", i, e)))?;
        }
        Ok(())
    }

    pub fn params(&self) -> ForestParams {
        self.params
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

fn mean(samples: &[Sample]) -> f64 {
    samples.iter().map(|s| s.target).sum::<f64>() / samples.len() as f64
}

fn squared_error(samples: &[Sample]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let m = mean(samples);
    samples.iter().map(|s| (s.target - m).powi(2)).sum()
}

fn build_node(samples: &[Sample], depth: usize, max_depth: usize) -> Node {
    let leaf = Node::Leaf {
        value: mean(samples),
    };

    if depth >= max_depth || samples.len() < 2 || squared_error(samples) <= f64::EPSILON {
        return leaf;
    }

    let Some(best) = best_split(samples) else {
        return leaf;
    };

    let (left, right): (Vec<Sample>, Vec<Sample>) = samples
        .iter()
        .partition(|s| s.features[best.feature] <= best.threshold);

    Node::Split {
        feature: best.feature,
        threshold: best.threshold,
        left: Box::new(build_node(&left, depth + 1, max_depth)),
        right: Box::new(build_node(&right, depth + 1, max_depth)),
    }
}

/// Lowest-error split over all features, midpoints between distinct values.
/// Ties keep the first candidate found.
fn best_split(samples: &[Sample]) -> Option<BestSplit> {
    let mut best: Option<BestSplit> = None;

    for feature in 0..NUM_FEATURES {
        let mut values: Vec<f64> = samples.iter().map(|s| s.features[feature]).collect();
        values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        values.dedup();

        for pair in values.windows(2) {
            let threshold = (pair[0] + pair[1]) / 2.0;
            let (left, right): (Vec<Sample>, Vec<Sample>) = samples
                .iter()
                .partition(|s| s.features[feature] <= threshold);
            let error = squared_error(&left) + squared_error(&right);

            if best.as_ref().map_or(true, |b| error < b.error) {
                best = Some(BestSplit {
                    feature,
                    threshold,
                    error,
                });
            }
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(n: usize) -> Vec<Sample> {
        (0..n)
            .map(|i| Sample {
                features: [i as f64, i as f64 / 10.0],
                target: 100.0 - i as f64 * 5.0,
            })
            .collect()
    }

    #[test]
    fn test_fit_is_deterministic() {
        let data = line(10);
        let a = RegressionForest::fit(&data, ForestParams::default()).unwrap();
        let b = RegressionForest::fit(&data, ForestParams::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_tree_count_matches_params() {
        let forest = RegressionForest::fit(&line(10), ForestParams::default()).unwrap();
        assert_eq!(forest.n_trees(), 10);
    }

    #[test]
    fn test_predictions_bounded_by_targets() {
        let data = line(10);
        let forest = RegressionForest::fit(&data, ForestParams::default()).unwrap();

        for x in [-5.0, 0.0, 3.3, 9.0, 50.0] {
            let p = forest.predict(&[x, x / 10.0]);
            assert!((55.0..=100.0).contains(&p), "prediction {} out of target range", p);
        }
    }

    #[test]
    fn test_single_sample_is_constant() {
        let data = vec![Sample {
            features: [1.0, 0.1],
            target: 77.0,
        }];
        let forest = RegressionForest::fit(&data, ForestParams::default()).unwrap();
        assert_eq!(forest.predict(&[100.0, 100.0]), 77.0);
    }

    #[test]
    fn test_invalid_params_rejected() {
        let data = line(3);
        let zero_trees = ForestParams {
            n_estimators: 0,
            ..ForestParams::default()
        };
        let zero_depth = ForestParams {
            max_depth: 0,
            ..ForestParams::default()
        };

        assert!(matches!(
            RegressionForest::fit(&data, zero_trees),
            Err(ScorerError::InvalidParams(_))
        ));
        assert!(matches!(
            RegressionForest::fit(&data, zero_depth),
            Err(ScorerError::InvalidParams(_))
        ));
        assert!(RegressionForest::fit(&[], ForestParams::default()).is_err());
    }

    fn decode(json: &str) -> RegressionForest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_fitted_forest_validates() {
        let forest = RegressionForest::fit(&line(10), ForestParams::default()).unwrap();
        assert!(forest.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_malformed_structure() {
        let params = r#""params":{"n_estimators":1,"max_depth":5,"seed":42}"#;

        let no_trees = decode(&format!(r#"{{{},"trees":[]}}"#, params));
        let bad_feature = decode(&format!(
            r#"{{{},"trees":[{{"kind":"split","feature":7,"threshold":1.0,
                "left":{{"kind":"leaf","value":90.0}},"right":{{"kind":"leaf","value":60.0}}}}]}}"#,
            params
        ));
        let too_many = decode(&format!(
            r#"{{{},"trees":[{{"kind":"leaf","value":90.0}},{{"kind":"leaf","value":80.0}}]}}"#,
            params
        ));

        for forest in [no_trees, bad_feature, too_many] {
            assert!(matches!(forest.validate(), Err(ScorerError::Artifact(_))));
        }
    }

    #[test]
    fn test_out_of_range_feature_does_not_panic() {
        let forest = decode(
            r#"{"params":{"n_estimators":1,"max_depth":5,"seed":42},"trees":[
                {"kind":"split","feature":7,"threshold":1.0,
                 "left":{"kind":"leaf","value":90.0},"right":{"kind":"leaf","value":60.0}}]}"#,
        );
        assert_eq!(forest.predict(&[5.0, 0.2]), 90.0);
    }

    #[test]
    fn test_serde_preserves_predictions() {
        let data = line(10);
        let forest = RegressionForest::fit(&data, ForestParams::default()).unwrap();
        let json = serde_json::to_string(&forest).unwrap();
        let restored: RegressionForest = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.params(), forest.params());
        let p1 = forest.predict(&[4.5, 0.45]);
        let p2 = restored.predict(&[4.5, 0.45]);
        assert!((p1 - p2).abs() < 1e-9);
    }
}
