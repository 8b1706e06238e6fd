//! Classifiers with a strict split between training and inference.
//!
//! An unfitted estimator holds only hyperparameters; [`Classifier::fit`]
//! returns a separate fitted type that carries only what prediction needs.
//! Fitted types expose plain, serializable parameter structs so a trained
//! model can be stored inside a bundle and rebuilt bit for bit.
//!
//! - [`tree`] — second-order regression trees (depth-wise or leaf-wise growth)
//! - [`gbdt`] — gradient-boosted trees for binary log-loss
//! - [`logistic`] — L2-regularized logistic regression trained by the [`Trainer`](crate::trainer::Trainer)
//! - [`stacking`] — out-of-fold stacking of boosted trees under a logistic meta-learner
//! - [`multi_output`] — one independent stack per label column

pub mod gbdt;
pub mod logistic;
pub mod multi_output;
pub mod stacking;
pub mod state;
pub mod tree;

pub use gbdt::{
    FittedGradientBoosting, GradientBoostingClassifier, GradientBoostingParams, GrowthPolicy,
};
pub use logistic::{LogisticModel, LogisticParams, LogisticRegression, SerializableLogisticParams};
pub use multi_output::{FittedMultiOutputClassifier, MultiOutputClassifier, MultiOutputParams};
pub use stacking::{FittedStackingClassifier, StackingClassifier, StackingParams};
pub use state::{Fitted, Unfitted};

use crate::evaluation::SplitError;
use crate::serialization::SerializableParams;
use ndarray::{Array1, ArrayView1, ArrayView2};
use thiserror::Error;

/// Error type for model fitting and prediction.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Empty data: {0}")]
    EmptyData(String),
    /// Row counts of features and targets disagree.
    #[error("Shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch { expected: String, got: String },
    /// Column count at predict time differs from fit time.
    #[error("Feature mismatch: expected {expected} features, got {got}")]
    FeatureMismatch { expected: usize, got: usize },
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    /// Stored parameters do not describe a valid model.
    #[error("Invalid model parameters: {0}")]
    InvalidParams(String),
    #[error("Target must be binary (0/1), found {0}")]
    InvalidTarget(u8),
    #[error(transparent)]
    Split(#[from] SplitError),
}

/// Trainable side of a gradient-trained model.
///
/// [`Trainer`](crate::trainer::Trainer) drives these methods; the model itself
/// knows nothing about losses or optimizers.
pub trait TrainableModel {
    type Input: ?Sized;
    type Prediction;
    type Params;
    type Gradients;
    type Output;

    fn forward(&self, input: &Self::Input) -> Self::Prediction;
    /// Gradients of the loss w.r.t. the parameters, given the loss gradient
    /// w.r.t. the model output.
    fn backward(&self, input: &Self::Input, grad_output: &Self::Prediction) -> Self::Gradients;
    fn params(&self) -> &Self::Params;
    fn update_params(&mut self, new_params: &Self::Params);

    fn into_fitted(self) -> Self::Output;
}

/// Arithmetic an optimizer needs on a parameter set.
pub trait ParamOps: Clone {
    fn add(&self, other: &Self) -> Self;
    fn scale(&self, scalar: f64) -> Self;
}

/// An unfitted binary classifier.
///
/// Targets are 0/1 bytes, one per row of `x`.
pub trait Classifier: Clone + Send + Sync {
    type Fitted: ProbabilisticClassifier;

    fn fit(&self, x: ArrayView2<f64>, y: ArrayView1<u8>) -> Result<Self::Fitted, ModelError>;
}

/// A fitted binary classifier that reports positive-class probabilities.
pub trait ProbabilisticClassifier: Clone + Send + Sync + Sized {
    /// Serializable representation of the fitted state.
    type Params: SerializableParams;

    /// Probability of the positive class for every row.
    fn predict_proba(&self, x: ArrayView2<f64>) -> Result<Array1<f64>, ModelError>;

    /// Hard 0/1 predictions at the 0.5 threshold.
    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<u8>, ModelError> {
        Ok(self.predict_proba(x)?.mapv(|p| u8::from(p >= 0.5)))
    }

    /// Number of feature columns seen during fit.
    fn n_features(&self) -> usize;

    fn extract_params(&self) -> Self::Params;

    fn from_params(params: Self::Params) -> Result<Self, ModelError>;
}

/// Shared argument checks for `fit`.
pub(crate) fn check_fit_input(x: ArrayView2<f64>, y: ArrayView1<u8>) -> Result<(), ModelError> {
    if x.nrows() == 0 {
        return Err(ModelError::EmptyData("cannot fit on zero rows".to_string()));
    }
    if x.nrows() != y.len() {
        return Err(ModelError::ShapeMismatch {
            expected: format!("{} targets", x.nrows()),
            got: format!("{}", y.len()),
        });
    }
    if let Some(&bad) = y.iter().find(|&&v| v > 1) {
        return Err(ModelError::InvalidTarget(bad));
    }
    Ok(())
}

/// Shared argument check for `predict_proba`.
pub(crate) fn check_n_features(expected: usize, x: ArrayView2<f64>) -> Result<(), ModelError> {
    if x.ncols() != expected {
        return Err(ModelError::FeatureMismatch {
            expected,
            got: x.ncols(),
        });
    }
    Ok(())
}

/// Logistic function, stable for large |z|.
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}
