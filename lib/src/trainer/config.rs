//! Training run configuration.
//!
//! Every field has a default, so a YAML file only needs the values it changes:
//!
//! ```yaml
//! data_path: data/train_data.csv
//! bundle_path: artifacts/formations.bundle
//! folds: 5
//! lgb:
//!   n_estimators: 200
//! ```

use crate::dataset::TextEncoding;
use crate::evaluation::StratifiedKFold;
use crate::model::{GradientBoostingClassifier, LogisticRegression, StackingClassifier};
use crate::predict::DEFAULT_TOP_K;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Settings of one training run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub data_path: PathBuf,
    pub encoding: TextEncoding,
    pub bundle_path: PathBuf,
    /// Share of rows held out for the final evaluation.
    pub test_size: f64,
    /// Seed of the holdout split and of the fold shuffling.
    pub seed: u64,
    pub folds: usize,
    /// Depth-wise boosted trees.
    #[serde(deserialize_with = "xgb_over_defaults")]
    pub xgb: GradientBoostingClassifier,
    /// Leaf-wise boosted trees.
    #[serde(deserialize_with = "lgb_over_defaults")]
    pub lgb: GradientBoostingClassifier,
    pub meta: LogisticRegression,
    /// Default number of recommendations, stored in the bundle.
    pub top_k: usize,
}

/// Applies the keys present in `patch` on top of `base`.
fn overlay<'de, D>(base: GradientBoostingClassifier, deserializer: D) -> Result<GradientBoostingClassifier, D::Error>
where
    D: Deserializer<'de>,
{
    let patch = serde_yaml::Value::deserialize(deserializer)?;
    let mut merged = serde_yaml::to_value(base).map_err(D::Error::custom)?;
    if let (serde_yaml::Value::Mapping(target), serde_yaml::Value::Mapping(changes)) =
        (&mut merged, patch)
    {
        target.extend(changes);
    }
    serde_yaml::from_value(merged).map_err(D::Error::custom)
}

fn xgb_over_defaults<'de, D: Deserializer<'de>>(d: D) -> Result<GradientBoostingClassifier, D::Error> {
    overlay(GradientBoostingClassifier::xgboost_style(), d)
}

fn lgb_over_defaults<'de, D: Deserializer<'de>>(d: D) -> Result<GradientBoostingClassifier, D::Error> {
    overlay(GradientBoostingClassifier::lightgbm_style(), d)
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("train_data.csv"),
            encoding: TextEncoding::Latin1,
            bundle_path: PathBuf::from("formation_predictor.bundle"),
            test_size: 0.2,
            seed: 42,
            folds: 5,
            xgb: GradientBoostingClassifier::xgboost_style(),
            lgb: GradientBoostingClassifier::lightgbm_style(),
            meta: LogisticRegression::default(),
            top_k: DEFAULT_TOP_K,
        }
    }
}

impl TrainingConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let config: TrainingConfig = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "test_size must be in (0, 1), got {}",
                self.test_size
            )));
        }
        if self.folds < 2 {
            return Err(ConfigError::Invalid(format!(
                "folds must be at least 2, got {}",
                self.folds
            )));
        }
        if self.top_k == 0 {
            return Err(ConfigError::Invalid("top_k must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Shuffled stratified folds used for stacking and for cross-validation.
    pub fn cv(&self) -> StratifiedKFold {
        StratifiedKFold::new(self.folds).with_shuffle(self.seed)
    }

    /// The per-label estimator: `xgb` and `lgb` under the logistic meta-learner.
    pub fn stacking(&self) -> StackingClassifier {
        StackingClassifier::new(
            vec![
                ("xgb".to_string(), self.xgb.clone()),
                ("lgb".to_string(), self.lgb.clone()),
            ],
            self.meta.clone(),
            self.cv(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GrowthPolicy;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = TrainingConfig::default();
        assert_eq!(config.test_size, 0.2);
        assert_eq!(config.seed, 42);
        assert_eq!(config.meta.c, 0.1);
        assert_eq!(config.meta.max_iter, 1000);
        assert_eq!(config.xgb.tree.growth, GrowthPolicy::DepthWise);
        assert_eq!(config.lgb.tree.growth, GrowthPolicy::LeafWise);
        assert_eq!(config.stacking(), StackingClassifier::default());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = TrainingConfig::from_yaml_str(
            "data_path: members.csv\nencoding: utf8\nlgb:\n  n_estimators: 10\n",
        )
        .unwrap();
        assert_eq!(config.data_path, PathBuf::from("members.csv"));
        assert_eq!(config.encoding, TextEncoding::Utf8);
        assert_eq!(config.lgb.n_estimators, 10);
        assert_eq!(config.lgb.learning_rate, 0.1);
        assert_eq!(config.lgb.tree.growth, GrowthPolicy::LeafWise);
        assert_eq!(config.lgb.tree.min_samples_leaf, 20);
        assert_eq!(config.xgb, GradientBoostingClassifier::xgboost_style());
        assert_eq!(config.folds, 5);
    }

    #[test]
    fn test_load_from_file() {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(b"folds: 3\ntop_k: 2\n").unwrap();
        let config = TrainingConfig::load(f.path()).unwrap();
        assert_eq!(config.folds, 3);
        assert_eq!(config.cv().n_splits(), 3);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            TrainingConfig::from_yaml_str("folds: 1\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            TrainingConfig::from_yaml_str("test_size: 1.0\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            TrainingConfig::from_yaml_str("folds: [1, 2]\n"),
            Err(ConfigError::Yaml(_))
        ));
        assert!(matches!(
            TrainingConfig::load("/nonexistent/config.yaml"),
            Err(ConfigError::Io { .. })
        ));
    }
}
