//! Gradient training loop and the end-to-end training workflow.
//!
//! - [`Trainer`] fits any [`TrainableModel`] with a loss, an optimizer and a regularizer
//! - [`config`] holds the YAML-loadable [`TrainingConfig`]
//! - [`workflow`] runs load → fit → evaluate → bundle

pub mod config;
pub mod workflow;

pub use config::TrainingConfig;
pub use workflow::{fit_bundle, run_training, TrainingError, TrainingOutcome};

use crate::{
    loss::Loss,
    model::{ModelError, ParamOps, TrainableModel},
    optimizer::Optimizer,
    regularizers::Regularizer,
};
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2};
use std::marker::PhantomData;
use tracing::debug;

/// Orchestrates the training loop for a `TrainableModel`.
///
/// Combines a loss function, optimizer, and regularizer to fit a model on a dataset.
/// Once built via `TrainerBuilder`, it is immutable and can be reused across multiple models
/// (as long as types match).
///
/// The `fit` method returns the model's fitted form, which contains only inference logic.
pub struct Trainer<L, O, M, R>
where
    L: Loss,
    M: TrainableModel,
    O: Optimizer<M::Params>,
    R: Regularizer<M>,
{
    pub(crate) batch_size: Option<usize>,
    pub(crate) max_epochs: usize,
    pub(crate) tol: Option<f64>,
    pub(crate) verbose: bool,
    pub(crate) loss_fn: L,
    pub(crate) optimizer: O,
    pub(crate) regularizer: R,
    _phantom_model: PhantomData<M>,
}

/// Fluent builder for constructing a `Trainer` with custom hyperparameters.
///
/// Defaults:
/// - `batch_size`: 32
/// - `max_epochs`: 1000
/// - `tol`: none (always runs `max_epochs`)
/// - `verbose`: true
pub struct TrainerBuilder<L, O, M, R>
where
    L: Loss,
    M: TrainableModel,
    O: Optimizer<M::Params>,
    R: Regularizer<M>,
{
    batch_size: Option<usize>,
    max_epochs: usize,
    tol: Option<f64>,
    verbose: bool,
    loss_fn: L,
    optimizer: O,
    regularizer: R,
    _phantom_model: PhantomData<M>,
}

impl<L, O, M, R> TrainerBuilder<L, O, M, R>
where
    L: Loss,
    M: TrainableModel,
    O: Optimizer<M::Params>,
    R: Regularizer<M>,
{
    /// Creates a new `TrainerBuilder` with the given components.
    ///
    /// # Arguments
    /// * `loss_fn` — differentiable loss (e.g., `BCEWithLogitsLoss`)
    /// * `optimizer` — parameter updater (e.g., `SGD`)
    /// * `regularizer` — penalty term (e.g., `L2` or `NoRegularizer`)
    pub fn new(loss_fn: L, optimizer: O, regularizer: R) -> Self {
        Self {
            batch_size: Some(32),
            max_epochs: 1000,
            tol: None,
            verbose: true,
            loss_fn,
            optimizer,
            regularizer,
            _phantom_model: PhantomData,
        }
    }

    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = Some(size);
        self
    }

    /// One update per epoch over every row.
    pub fn full_batch(mut self) -> Self {
        self.batch_size = None;
        self
    }

    pub fn max_epochs(mut self, epochs: usize) -> Self {
        self.max_epochs = epochs;
        self
    }

    /// Stops early once the epoch loss improves by less than `tol`.
    pub fn tol(mut self, tol: f64) -> Self {
        self.tol = Some(tol);
        self
    }

    /// Sets verbosity for training output.
    ///
    /// When `true`, epoch losses are emitted as `debug` events.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn build(self) -> Trainer<L, O, M, R> {
        Trainer {
            batch_size: self.batch_size,
            max_epochs: self.max_epochs,
            tol: self.tol,
            verbose: self.verbose,
            loss_fn: self.loss_fn,
            optimizer: self.optimizer,
            regularizer: self.regularizer,
            _phantom_model: PhantomData,
        }
    }
}

impl<L, O, M, P, R> Trainer<L, O, M, R>
where
    L: Loss,
    M: TrainableModel<Input = Array2<f64>, Prediction = Array1<f64>, Params = P, Gradients = P>,
    O: Optimizer<P>,
    R: Regularizer<M>,
    P: ParamOps,
{
    /// Trains the model on `x` / `y` for up to `max_epochs`.
    ///
    /// # Returns
    /// A fitted model ready for inference (`M::Output`), or an error if:
    /// - There are no rows
    /// - Row counts of `x` and `y` differ
    /// - The batch size is zero
    ///
    /// # Notes
    /// - Batches are taken in row order; training is deterministic.
    /// - Gradients are averaged per batch before applying regularization.
    pub fn fit(
        &self,
        mut model: M,
        x: ArrayView2<f64>,
        y: ArrayView1<f64>,
    ) -> Result<M::Output, ModelError> {
        let n_total = x.nrows();
        if n_total == 0 {
            return Err(ModelError::EmptyData("training set is empty".to_string()));
        }
        if y.len() != n_total {
            return Err(ModelError::ShapeMismatch {
                expected: format!("{n_total} targets"),
                got: format!("{}", y.len()),
            });
        }
        let batch_size = match self.batch_size {
            Some(0) => {
                return Err(ModelError::InvalidParameter(
                    "batch_size must be positive".to_string(),
                ))
            }
            Some(size) => size.min(n_total),
            None => n_total,
        };

        let batches: Vec<(Array2<f64>, Array1<f64>)> = (0..n_total)
            .step_by(batch_size)
            .map(|start| {
                let end = (start + batch_size).min(n_total);
                (
                    x.slice(s![start..end, ..]).to_owned(),
                    y.slice(s![start..end]).to_owned(),
                )
            })
            .collect();

        let mut previous_loss = f64::INFINITY;
        for epoch in 0..self.max_epochs {
            let mut total_loss = 0.0;
            for (batch_x, batch_y) in &batches {
                let preds = model.forward(batch_x);
                let (reg_penalty, reg_grad) = self.regularizer.regularizer_penalty_grad(&model);
                total_loss += self.loss_fn.loss(&preds, batch_y) * batch_y.len() as f64 + reg_penalty;

                let grad_preds = self.loss_fn.grad_wrt_prediction(&preds, batch_y);
                let grads = model.backward(batch_x, &grad_preds);
                let total_grads = grads.add(&reg_grad);
                let new_params = self.optimizer.step(model.params(), &total_grads);
                model.update_params(&new_params);
            }

            let avg_loss = total_loss / n_total as f64;
            if self.verbose {
                debug!(epoch, loss = avg_loss, "training epoch");
            }
            if let Some(tol) = self.tol {
                if (previous_loss - avg_loss).abs() < tol {
                    debug!(epoch, loss = avg_loss, "converged");
                    break;
                }
            }
            previous_loss = avg_loss;
        }

        Ok(model.into_fitted())
    }
}

impl<L, O, M, R> Trainer<L, O, M, R>
where
    L: Loss,
    M: TrainableModel,
    O: Optimizer<M::Params>,
    R: Regularizer<M>,
{
    /// Convenience constructor that starts the builder pattern.
    ///
    /// Equivalent to `TrainerBuilder::new(...)`.
    pub fn builder(loss_fn: L, optimizer: O, regularizer: R) -> TrainerBuilder<L, O, M, R> {
        TrainerBuilder::new(loss_fn, optimizer, regularizer)
    }
}
