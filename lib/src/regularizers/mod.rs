//! Weight penalties added to the training loss.

use crate::model::logistic::LogisticModel;
use crate::model::{LogisticParams, TrainableModel, Unfitted};
use ndarray::Array1;

/// A penalty on model parameters, evaluated alongside the data loss.
///
/// Returns the penalty value and its gradient in the model's gradient type,
/// so the trainer can add it to the data gradient before the optimizer step.
pub trait Regularizer<M: TrainableModel> {
    fn regularizer_penalty_grad(&self, model: &M) -> (f64, M::Gradients);
}

/// Ridge penalty `(lambda / 2) * ||w||^2`. The bias is not penalized.
#[derive(Clone, Copy, Debug)]
pub struct L2 {
    lambda: f64,
}

impl L2 {
    pub fn new(lambda: f64) -> Self {
        Self { lambda }
    }

    pub fn lambda(&self) -> f64 {
        self.lambda
    }
}

impl Regularizer<LogisticModel<Unfitted>> for L2 {
    fn regularizer_penalty_grad(&self, model: &LogisticModel<Unfitted>) -> (f64, LogisticParams) {
        let params = model.params();
        let penalty = 0.5 * self.lambda * params.weights.dot(&params.weights);
        let grad = LogisticParams {
            weights: &params.weights * self.lambda,
            bias: 0.0,
        };
        (penalty, grad)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoRegularizer;

impl Regularizer<LogisticModel<Unfitted>> for NoRegularizer {
    fn regularizer_penalty_grad(&self, model: &LogisticModel<Unfitted>) -> (f64, LogisticParams) {
        let n = model.params().weights.len();
        (
            0.0,
            LogisticParams {
                weights: Array1::zeros(n),
                bias: 0.0,
            },
        )
    }
}
