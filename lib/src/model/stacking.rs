//! Stacked generalization for one binary label.
//!
//! Each base learner is cross-fit over the folds of a [`StratifiedKFold`]; its
//! positive-class probability on every held-out row becomes one column of the
//! out-of-fold matrix. The meta-learner is trained on that matrix, and the base
//! learners are then refit on all rows. At prediction time the refit bases
//! produce the meta-features.

use crate::evaluation::StratifiedKFold;
use crate::model::gbdt::{FittedGradientBoosting, GradientBoostingClassifier, GradientBoostingParams};
use crate::model::logistic::{LogisticModel, LogisticRegression, SerializableLogisticParams};
use crate::model::{
    check_fit_input, check_n_features, Classifier, Fitted, ModelError, ProbabilisticClassifier,
};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Unfitted stack: named base learners, a meta-learner and the CV splitter.
#[derive(Clone, Debug, PartialEq)]
pub struct StackingClassifier {
    estimators: Vec<(String, GradientBoostingClassifier)>,
    final_estimator: LogisticRegression,
    cv: StratifiedKFold,
}

impl Default for StackingClassifier {
    /// `xgb` and `lgb` boosted trees under `LogisticRegression(C=0.1)`, 5 shuffled folds, seed 42.
    fn default() -> Self {
        Self::new(
            vec![
                ("xgb".to_string(), GradientBoostingClassifier::xgboost_style()),
                ("lgb".to_string(), GradientBoostingClassifier::lightgbm_style()),
            ],
            LogisticRegression::default(),
            StratifiedKFold::new(5).with_shuffle(42),
        )
    }
}

impl StackingClassifier {
    pub fn new(
        estimators: Vec<(String, GradientBoostingClassifier)>,
        final_estimator: LogisticRegression,
        cv: StratifiedKFold,
    ) -> Self {
        Self {
            estimators,
            final_estimator,
            cv,
        }
    }

    pub fn estimators(&self) -> &[(String, GradientBoostingClassifier)] {
        &self.estimators
    }

    pub fn final_estimator(&self) -> &LogisticRegression {
        &self.final_estimator
    }

    pub fn cv(&self) -> &StratifiedKFold {
        &self.cv
    }

    /// Positive-class probabilities of every base learner on held-out rows.
    fn out_of_fold(&self, x: ArrayView2<f64>, y: ArrayView1<u8>) -> Result<Array2<f64>, ModelError> {
        let labels = y.to_vec();
        let folds = self.cv.split(&labels)?;

        let jobs: Vec<(usize, usize)> = (0..self.estimators.len())
            .flat_map(|e| (0..folds.len()).map(move |f| (e, f)))
            .collect();
        let columns = jobs
            .par_iter()
            .map(|&(e, f)| -> Result<(usize, usize, Array1<f64>), ModelError> {
                let (train, test) = &folds[f];
                let fitted = self.estimators[e].1.fit(
                    x.select(Axis(0), train).view(),
                    y.select(Axis(0), train).view(),
                )?;
                let proba = fitted.predict_proba(x.select(Axis(0), test).view())?;
                Ok((e, f, proba))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut oof = Array2::zeros((x.nrows(), self.estimators.len()));
        for (e, f, proba) in columns {
            for (&row, &p) in folds[f].1.iter().zip(proba.iter()) {
                oof[[row, e]] = p;
            }
        }
        Ok(oof)
    }
}

impl Classifier for StackingClassifier {
    type Fitted = FittedStackingClassifier;

    fn fit(&self, x: ArrayView2<f64>, y: ArrayView1<u8>) -> Result<Self::Fitted, ModelError> {
        check_fit_input(x, y)?;
        if self.estimators.is_empty() {
            return Err(ModelError::InvalidParameter(
                "stacking needs at least one base estimator".to_string(),
            ));
        }
        let n_features = x.ncols();

        let positives = y.iter().filter(|&&v| v == 1).count();
        if positives == 0 || positives == y.len() {
            let probability = if positives == 0 { 0.0 } else { 1.0 };
            warn!(
                rows = y.len(),
                probability, "label has a single class; using a constant predictor"
            );
            return Ok(FittedStackingClassifier {
                stack: FittedStack::Constant { probability },
                n_features,
            });
        }

        let oof = self.out_of_fold(x, y)?;
        let meta = self.final_estimator.fit(oof.view(), y)?;
        let bases = self
            .estimators
            .par_iter()
            .map(|(name, estimator)| -> Result<_, ModelError> {
                Ok((name.clone(), estimator.fit(x, y)?))
            })
            .collect::<Result<Vec<_>, ModelError>>()?;

        debug!(
            rows = x.nrows(),
            bases = bases.len(),
            folds = self.cv.n_splits(),
            "fitted stack"
        );
        Ok(FittedStackingClassifier {
            stack: FittedStack::Ensemble { bases, meta },
            n_features,
        })
    }
}

#[derive(Clone, Debug)]
enum FittedStack {
    /// Every training row had the same target.
    Constant { probability: f64 },
    Ensemble {
        bases: Vec<(String, FittedGradientBoosting)>,
        meta: LogisticModel<Fitted>,
    },
}

/// Serializable parameters of a fitted stack.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum StackingParams {
    Constant {
        probability: f64,
        n_features: usize,
    },
    Ensemble {
        n_features: usize,
        estimators: Vec<(String, GradientBoostingParams)>,
        final_estimator: SerializableLogisticParams,
    },
}

/// Fitted stack ready for inference.
#[derive(Clone, Debug)]
pub struct FittedStackingClassifier {
    stack: FittedStack,
    n_features: usize,
}

impl FittedStackingClassifier {
    /// Names of the base learners, empty for a constant stack.
    pub fn estimator_names(&self) -> Vec<&str> {
        match &self.stack {
            FittedStack::Constant { .. } => Vec::new(),
            FittedStack::Ensemble { bases, .. } => bases.iter().map(|(n, _)| n.as_str()).collect(),
        }
    }

    pub fn is_constant(&self) -> bool {
        matches!(self.stack, FittedStack::Constant { .. })
    }

    /// Base-learner probabilities, one column per base learner.
    pub fn meta_features(&self, x: ArrayView2<f64>) -> Result<Array2<f64>, ModelError> {
        check_n_features(self.n_features, x)?;
        let bases = match &self.stack {
            FittedStack::Constant { .. } => return Ok(Array2::zeros((x.nrows(), 0))),
            FittedStack::Ensemble { bases, .. } => bases,
        };
        let mut features = Array2::zeros((x.nrows(), bases.len()));
        for (mut column, (_, base)) in features.axis_iter_mut(Axis(1)).zip(bases) {
            column.assign(&base.predict_proba(x)?);
        }
        Ok(features)
    }
}

impl ProbabilisticClassifier for FittedStackingClassifier {
    type Params = StackingParams;

    fn predict_proba(&self, x: ArrayView2<f64>) -> Result<Array1<f64>, ModelError> {
        check_n_features(self.n_features, x)?;
        match &self.stack {
            FittedStack::Constant { probability } => Ok(Array1::from_elem(x.nrows(), *probability)),
            FittedStack::Ensemble { meta, .. } => meta.predict_proba(self.meta_features(x)?.view()),
        }
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn extract_params(&self) -> Self::Params {
        match &self.stack {
            FittedStack::Constant { probability } => StackingParams::Constant {
                probability: *probability,
                n_features: self.n_features,
            },
            FittedStack::Ensemble { bases, meta } => StackingParams::Ensemble {
                n_features: self.n_features,
                estimators: bases
                    .iter()
                    .map(|(name, base)| (name.clone(), base.extract_params()))
                    .collect(),
                final_estimator: meta.extract_params(),
            },
        }
    }

    fn from_params(params: Self::Params) -> Result<Self, ModelError> {
        match params {
            StackingParams::Constant {
                probability,
                n_features,
            } => {
                if !(0.0..=1.0).contains(&probability) {
                    return Err(ModelError::InvalidParams(format!(
                        "constant probability {probability} outside [0, 1]"
                    )));
                }
                Ok(Self {
                    stack: FittedStack::Constant { probability },
                    n_features,
                })
            }
            StackingParams::Ensemble {
                n_features,
                estimators,
                final_estimator,
            } => {
                let bases = estimators
                    .into_iter()
                    .map(|(name, p)| -> Result<_, ModelError> {
                        let base = FittedGradientBoosting::from_params(p)?;
                        if base.n_features() != n_features {
                            return Err(ModelError::InvalidParams(format!(
                                "base learner '{name}' expects {} features, stack has {n_features}",
                                base.n_features()
                            )));
                        }
                        Ok((name, base))
                    })
                    .collect::<Result<Vec<_>, ModelError>>()?;
                let meta = LogisticModel::<Fitted>::from_params(final_estimator)?;
                if bases.is_empty() || meta.n_features() != bases.len() {
                    return Err(ModelError::InvalidParams(format!(
                        "meta-learner expects {} inputs, stack has {} base learners",
                        meta.n_features(),
                        bases.len()
                    )));
                }
                Ok(Self {
                    stack: FittedStack::Ensemble { bases, meta },
                    n_features,
                })
            }
        }
    }
}
