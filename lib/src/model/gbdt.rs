//! Gradient-boosted trees for binary classification.
//!
//! Boosting minimizes log-loss on the raw score `F(x)`; each round fits a
//! [`RegressionTree`] to the gradient `p - y` and hessian `p (1 - p)` of the
//! current predictions on a row and column sample, then adds
//! `learning_rate * tree(x)` to `F`. Probabilities are `sigmoid(F(x))`.
//!
//! # Example
//! ```ignore
//! use formation_recommender::model::{Classifier, GradientBoostingClassifier, ProbabilisticClassifier};
//!
//! let fitted = GradientBoostingClassifier::lightgbm_style().fit(x.view(), y.view())?;
//! let proba = fitted.predict_proba(x.view())?;
//! ```

pub use crate::model::tree::{GrowthPolicy, Node, RegressionTree, TreeConfig};

use crate::model::tree::TreeBuilder;
use crate::model::{
    check_fit_input, check_n_features, sigmoid, Classifier, ModelError, ProbabilisticClassifier,
};
use ndarray::{Array1, ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Clamp for the prior probability used as base score.
const PROB_EPS: f64 = 1e-6;
/// Floor for per-row hessians.
const HESS_EPS: f64 = 1e-16;

/// Boosted-tree classifier hyperparameters (unfitted).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradientBoostingClassifier {
    pub n_estimators: usize,
    pub learning_rate: f64,
    /// Fraction of rows drawn (without replacement) for each tree.
    pub subsample: f64,
    /// Fraction of feature columns drawn for each tree.
    pub colsample_bytree: f64,
    pub seed: u64,
    #[serde(flatten)]
    pub tree: TreeConfig,
}

impl Default for GradientBoostingClassifier {
    fn default() -> Self {
        Self::xgboost_style()
    }
}

impl GradientBoostingClassifier {
    /// Depth-wise growth with an L2 leaf penalty.
    pub fn xgboost_style() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            subsample: 0.8,
            colsample_bytree: 0.8,
            seed: 42,
            tree: TreeConfig {
                growth: GrowthPolicy::DepthWise,
                max_depth: 3,
                max_leaves: 31,
                reg_lambda: 1.0,
                min_child_weight: 1.0,
                min_samples_leaf: 1,
            },
        }
    }

    /// Leaf-wise growth with a leaf budget and a minimum leaf size.
    pub fn lightgbm_style() -> Self {
        Self {
            tree: TreeConfig {
                growth: GrowthPolicy::LeafWise,
                max_depth: 3,
                max_leaves: 31,
                reg_lambda: 0.0,
                min_child_weight: 1e-3,
                min_samples_leaf: 20,
            },
            ..Self::xgboost_style()
        }
    }

    pub fn with_n_estimators(mut self, n_estimators: usize) -> Self {
        self.n_estimators = n_estimators;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn validate(&self) -> Result<(), ModelError> {
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(ModelError::InvalidParameter(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        for (name, value) in [("subsample", self.subsample), ("colsample_bytree", self.colsample_bytree)] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(ModelError::InvalidParameter(format!(
                    "{} must be in (0, 1], got {}",
                    name, value
                )));
            }
        }
        if self.tree.reg_lambda < 0.0 {
            return Err(ModelError::InvalidParameter(
                "reg_lambda must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Number of items kept when sampling `fraction` of `n`, at least one.
fn sample_size(fraction: f64, n: usize) -> usize {
    ((fraction * n as f64).floor() as usize).clamp(1, n)
}

/// Sorted sample of `amount` indices out of `n`.
fn sorted_sample(rng: &mut StdRng, n: usize, amount: usize) -> Vec<usize> {
    let mut picked = if amount < n {
        index::sample(rng, n, amount).into_vec()
    } else {
        (0..n).collect()
    };
    picked.sort_unstable();
    picked
}

impl Classifier for GradientBoostingClassifier {
    type Fitted = FittedGradientBoosting;

    fn fit(&self, x: ArrayView2<f64>, y: ArrayView1<u8>) -> Result<Self::Fitted, ModelError> {
        check_fit_input(x, y)?;
        self.validate()?;
        let (n, d) = x.dim();
        if d == 0 {
            return Err(ModelError::EmptyData("cannot fit on zero features".to_string()));
        }

        let target: Vec<f64> = y.iter().map(|&v| f64::from(v)).collect();
        let prior = (target.iter().sum::<f64>() / n as f64).clamp(PROB_EPS, 1.0 - PROB_EPS);
        let base_score = (prior / (1.0 - prior)).ln();

        let mut raw = vec![base_score; n];
        let mut grad = vec![0.0; n];
        let mut hess = vec![0.0; n];
        let mut rng = StdRng::seed_from_u64(self.seed);
        let n_rows = sample_size(self.subsample, n);
        let n_cols = sample_size(self.colsample_bytree, d);

        let mut trees = Vec::with_capacity(self.n_estimators);
        for _ in 0..self.n_estimators {
            for i in 0..n {
                let p = sigmoid(raw[i]);
                grad[i] = p - target[i];
                hess[i] = (p * (1.0 - p)).max(HESS_EPS);
            }

            let rows = sorted_sample(&mut rng, n, n_rows);
            let features = sorted_sample(&mut rng, d, n_cols);
            let tree = TreeBuilder::new(&self.tree, x.view(), &grad, &hess, &features).build(rows);

            for (score, row) in raw.iter_mut().zip(x.rows()) {
                *score += self.learning_rate * tree.predict_row(row);
            }
            trees.push(tree);
        }

        debug!(
            rows = n,
            features = d,
            trees = trees.len(),
            growth = ?self.tree.growth,
            "fitted boosted trees"
        );

        Ok(FittedGradientBoosting {
            base_score,
            learning_rate: self.learning_rate,
            trees,
            n_features: d,
        })
    }
}

/// Serializable parameters of fitted boosted trees.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostingParams {
    pub base_score: f64,
    pub learning_rate: f64,
    pub n_features: usize,
    pub trees: Vec<Vec<Node>>,
}

/// Fitted boosted trees ready for inference.
#[derive(Clone, Debug, PartialEq)]
pub struct FittedGradientBoosting {
    base_score: f64,
    learning_rate: f64,
    trees: Vec<RegressionTree>,
    n_features: usize,
}

impl FittedGradientBoosting {
    /// Raw additive score `F(x)` for every row.
    pub fn decision_function(&self, x: ArrayView2<f64>) -> Result<Array1<f64>, ModelError> {
        check_n_features(self.n_features, x)?;
        Ok(x.rows()
            .into_iter()
            .map(|row| {
                self.base_score
                    + self.learning_rate * self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>()
            })
            .collect())
    }

    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }

    pub fn base_score(&self) -> f64 {
        self.base_score
    }
}

impl ProbabilisticClassifier for FittedGradientBoosting {
    type Params = GradientBoostingParams;

    fn predict_proba(&self, x: ArrayView2<f64>) -> Result<Array1<f64>, ModelError> {
        Ok(self.decision_function(x)?.mapv(sigmoid))
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn extract_params(&self) -> Self::Params {
        GradientBoostingParams {
            base_score: self.base_score,
            learning_rate: self.learning_rate,
            n_features: self.n_features,
            trees: self.trees.iter().map(|t| t.nodes().to_vec()).collect(),
        }
    }

    fn from_params(params: Self::Params) -> Result<Self, ModelError> {
        if !params.base_score.is_finite() || !params.learning_rate.is_finite() {
            return Err(ModelError::InvalidParams(
                "non-finite base score or learning rate".to_string(),
            ));
        }
        let trees = params
            .trees
            .into_iter()
            .map(|nodes| RegressionTree::from_nodes(nodes, params.n_features))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            base_score: params.base_score,
            learning_rate: params.learning_rate,
            trees,
            n_features: params.n_features,
        })
    }
}
