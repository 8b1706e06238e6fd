//! L2-regularized logistic regression.
//!
//! The model follows the same state split as every other estimator here:
//! - [`LogisticModel<Unfitted>`] implements [`TrainableModel`] and is driven by the
//!   [`Trainer`](crate::trainer::Trainer).
//! - [`LogisticModel<Fitted>`] only predicts and serializes.
//!
//! [`LogisticRegression`] is the hyperparameter-only front end used as the
//! stacking meta-learner. It minimizes
//! `mean(log_loss) + 1 / (2 * C * n) * ||w||^2` by full-batch gradient descent
//! with step `1 / L`, where `L` bounds the curvature of the objective.

use crate::loss::BCEWithLogitsLoss;
use crate::model::{
    check_fit_input, check_n_features, sigmoid, Classifier, Fitted, ModelError, ParamOps,
    ProbabilisticClassifier, TrainableModel, Unfitted,
};
use crate::optimizer::SGD;
use crate::regularizers::L2;
use crate::trainer::Trainer;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use tracing::debug;

/// Trainable parameters of a logistic model: weights and bias.
///
/// Implements [`ParamOps`] to support optimizer updates.
#[derive(Clone, Debug, PartialEq)]
pub struct LogisticParams {
    pub weights: Array1<f64>,
    pub bias: f64,
}

impl ParamOps for LogisticParams {
    fn add(&self, other: &Self) -> Self {
        Self {
            weights: &self.weights + &other.weights,
            bias: self.bias + other.bias,
        }
    }

    fn scale(&self, scalar: f64) -> Self {
        Self {
            weights: &self.weights * scalar,
            bias: self.bias * scalar,
        }
    }
}

/// Serializable representation of logistic model parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SerializableLogisticParams {
    pub weights: Vec<f64>,
    pub bias: f64,
}

impl From<&LogisticParams> for SerializableLogisticParams {
    fn from(params: &LogisticParams) -> Self {
        Self {
            weights: params.weights.to_vec(),
            bias: params.bias,
        }
    }
}

/// A logistic model with state encoded at the type level.
///
/// This enforces, at compile time, that you cannot call `predict_proba()` on an untrained model.
#[derive(Clone, Debug)]
pub struct LogisticModel<S> {
    params: LogisticParams,
    _state: PhantomData<S>,
}

impl<S> LogisticModel<S> {
    /// Current weights and bias.
    pub fn params(&self) -> &LogisticParams {
        &self.params
    }

    /// Raw score `X @ w + b`.
    fn logits(&self, x: &ArrayView2<f64>) -> Array1<f64> {
        x.dot(&self.params.weights) + self.params.bias
    }
}

impl LogisticModel<Unfitted> {
    /// Creates a model with zero-initialized weights.
    pub fn new(n_features: usize) -> Self {
        Self {
            params: LogisticParams {
                weights: Array1::zeros(n_features),
                bias: 0.0,
            },
            _state: PhantomData,
        }
    }
}

impl LogisticModel<Fitted> {
    /// Wraps trained parameters. Typically called by [`TrainableModel::into_fitted`].
    pub fn from_trained(params: LogisticParams) -> Self {
        Self {
            params,
            _state: PhantomData,
        }
    }
}

/// Forward pass: `X @ w + b` (logits).
/// Backward pass: `∇w = X^T · grad`, `∇b = sum(grad)`.
impl TrainableModel for LogisticModel<Unfitted> {
    type Input = Array2<f64>;
    type Prediction = Array1<f64>;
    type Params = LogisticParams;
    type Gradients = LogisticParams;
    type Output = LogisticModel<Fitted>;

    fn forward(&self, x: &Self::Input) -> Self::Prediction {
        self.logits(&x.view())
    }

    fn backward(&self, x: &Self::Input, grad_output: &Self::Prediction) -> Self::Gradients {
        LogisticParams {
            weights: x.t().dot(grad_output),
            bias: grad_output.sum(),
        }
    }

    fn params(&self) -> &Self::Params {
        &self.params
    }

    fn update_params(&mut self, new_params: &Self::Params) {
        self.params = new_params.clone();
    }

    fn into_fitted(self) -> LogisticModel<Fitted> {
        LogisticModel::from_trained(self.params)
    }
}

impl ProbabilisticClassifier for LogisticModel<Fitted> {
    type Params = SerializableLogisticParams;

    fn predict_proba(&self, x: ArrayView2<f64>) -> Result<Array1<f64>, ModelError> {
        check_n_features(self.params.weights.len(), x)?;
        Ok(self.logits(&x).mapv(sigmoid))
    }

    fn n_features(&self) -> usize {
        self.params.weights.len()
    }

    fn extract_params(&self) -> Self::Params {
        (&self.params).into()
    }

    fn from_params(params: Self::Params) -> Result<Self, ModelError> {
        if !params.bias.is_finite() || params.weights.iter().any(|w| !w.is_finite()) {
            return Err(ModelError::InvalidParams(
                "logistic weights must be finite".to_string(),
            ));
        }
        Ok(Self::from_trained(LogisticParams {
            weights: Array1::from(params.weights),
            bias: params.bias,
        }))
    }
}

/// Logistic regression hyperparameters (unfitted).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogisticRegression {
    /// Inverse regularization strength; smaller means stronger shrinkage.
    pub c: f64,
    pub max_iter: usize,
    /// Stop once the epoch loss changes by less than this.
    pub tol: f64,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self {
            c: 0.1,
            max_iter: 1000,
            tol: 1e-10,
        }
    }
}

impl LogisticRegression {
    pub fn with_c(mut self, c: f64) -> Self {
        self.c = c;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    fn validate(&self) -> Result<(), ModelError> {
        if !(self.c > 0.0 && self.c.is_finite()) {
            return Err(ModelError::InvalidParameter(format!(
                "C must be positive, got {}",
                self.c
            )));
        }
        if self.max_iter == 0 {
            return Err(ModelError::InvalidParameter(
                "max_iter must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Classifier for LogisticRegression {
    type Fitted = LogisticModel<Fitted>;

    fn fit(&self, x: ArrayView2<f64>, y: ArrayView1<u8>) -> Result<Self::Fitted, ModelError> {
        check_fit_input(x, y)?;
        self.validate()?;
        let (n, d) = x.dim();

        let lambda = 1.0 / (self.c * n as f64);
        // Lipschitz bound of the mean log-loss gradient (bias as a unit column) plus the ridge term.
        let mean_sq_norm = x.map_axis(Axis(1), |row| row.dot(&row)).mean().unwrap_or(0.0);
        let lr = 1.0 / (0.25 * (mean_sq_norm + 1.0) + lambda);

        let target = y.mapv(f64::from);
        let fitted = Trainer::builder(BCEWithLogitsLoss, SGD::new(lr), L2::new(lambda))
            .full_batch()
            .max_epochs(self.max_iter)
            .tol(self.tol)
            .verbose(false)
            .build()
            .fit(LogisticModel::<Unfitted>::new(d), x, target.view())?;

        debug!(rows = n, features = d, lambda, lr, "fitted logistic regression");
        Ok(fitted)
    }
}
