//! One independent binary classifier per label column.

use crate::model::{check_n_features, Classifier, ModelError, ProbabilisticClassifier, StackingClassifier};
use ndarray::{Array2, ArrayView2, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::info;

/// Fits a clone of `estimator` on every column of a multi-hot target matrix.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MultiOutputClassifier<C = StackingClassifier> {
    estimator: C,
}

impl<C: Classifier> MultiOutputClassifier<C> {
    pub fn new(estimator: C) -> Self {
        Self { estimator }
    }

    /// The per-label estimator template.
    pub fn estimator(&self) -> &C {
        &self.estimator
    }

    /// Fits one model per column of `y`, in parallel.
    ///
    /// Column `j` of `y` must hold the 0/1 targets of label `j`; the fitted
    /// models keep that order.
    pub fn fit(
        &self,
        x: ArrayView2<f64>,
        y: ArrayView2<u8>,
    ) -> Result<FittedMultiOutputClassifier<C::Fitted>, ModelError> {
        if y.ncols() == 0 {
            return Err(ModelError::EmptyData("target matrix has no label columns".to_string()));
        }
        if x.nrows() != y.nrows() {
            return Err(ModelError::ShapeMismatch {
                expected: format!("{} target rows", x.nrows()),
                got: format!("{}", y.nrows()),
            });
        }

        let started = Instant::now();
        let estimators = (0..y.ncols())
            .into_par_iter()
            .map(|label| self.estimator.fit(x, y.column(label)))
            .collect::<Result<Vec<_>, ModelError>>()?;

        info!(
            rows = x.nrows(),
            labels = estimators.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "fitted multi-output model"
        );
        Ok(FittedMultiOutputClassifier {
            estimators,
            n_features: x.ncols(),
        })
    }
}

/// Serializable parameters: one entry per label, in label order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MultiOutputParams<P> {
    pub n_features: usize,
    pub estimators: Vec<P>,
}

/// Fitted per-label models.
#[derive(Clone, Debug)]
pub struct FittedMultiOutputClassifier<F> {
    estimators: Vec<F>,
    n_features: usize,
}

impl<F: ProbabilisticClassifier> FittedMultiOutputClassifier<F> {
    pub fn estimators(&self) -> &[F] {
        &self.estimators
    }

    pub fn n_outputs(&self) -> usize {
        self.estimators.len()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Positive-class probability of every label, shape `(rows, labels)`.
    pub fn predict_proba(&self, x: ArrayView2<f64>) -> Result<Array2<f64>, ModelError> {
        check_n_features(self.n_features, x)?;
        let columns = self
            .estimators
            .par_iter()
            .map(|estimator| estimator.predict_proba(x))
            .collect::<Result<Vec<_>, ModelError>>()?;

        let mut proba = Array2::zeros((x.nrows(), columns.len()));
        for (mut target, column) in proba.axis_iter_mut(Axis(1)).zip(&columns) {
            target.assign(column);
        }
        Ok(proba)
    }

    /// Hard 0/1 decisions at the 0.5 threshold, shape `(rows, labels)`.
    pub fn predict(&self, x: ArrayView2<f64>) -> Result<Array2<u8>, ModelError> {
        Ok(self.predict_proba(x)?.mapv(|p| u8::from(p >= 0.5)))
    }

    pub fn extract_params(&self) -> MultiOutputParams<F::Params> {
        MultiOutputParams {
            n_features: self.n_features,
            estimators: self.estimators.iter().map(F::extract_params).collect(),
        }
    }

    pub fn from_params(params: MultiOutputParams<F::Params>) -> Result<Self, ModelError> {
        let estimators = params
            .estimators
            .into_iter()
            .map(F::from_params)
            .collect::<Result<Vec<_>, _>>()?;
        if estimators.is_empty() {
            return Err(ModelError::InvalidParams("no per-label models".to_string()));
        }
        if let Some(bad) = estimators.iter().find(|e| e.n_features() != params.n_features) {
            return Err(ModelError::InvalidParams(format!(
                "label model expects {} features, multi-output model has {}",
                bad.n_features(),
                params.n_features
            )));
        }
        Ok(Self {
            estimators,
            n_features: params.n_features,
        })
    }
}
