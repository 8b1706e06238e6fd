//! Model evaluation: splitting, cross-validation, metrics and the report.
//!
//! Every label is scored twice: by stratified k-fold accuracy on the training
//! rows, and by accuracy and macro-F1 of the final model on the held-out rows.

pub mod cross_val;
pub mod metrics;
pub mod split;

pub use cross_val::cross_val_score;
pub use metrics::{accuracy, f1_macro, mean_std};
pub use split::{train_test_split, SplitError, StratifiedKFold};

use crate::model::{Classifier, ModelError};
use ndarray::{ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("length mismatch: expected {expected}, got {got}")]
    LengthMismatch { expected: usize, got: usize },
    #[error("cannot score an empty set")]
    Empty,
    #[error(transparent)]
    Split(#[from] SplitError),
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Cross-validated accuracies for every column of `y`, one list per label.
pub fn cross_val_score_per_label<C: Classifier>(
    estimator: &C,
    x: ArrayView2<f64>,
    y: ArrayView2<u8>,
    cv: &StratifiedKFold,
) -> Result<Vec<Vec<f64>>, EvaluationError> {
    y.axis_iter(Axis(1))
        .enumerate()
        .map(|(label, column)| -> Result<Vec<f64>, EvaluationError> {
            let scores = cross_val_score(estimator, x, column, cv)?;
            let (mean, std) = mean_std(&scores);
            info!(label, mean, std, "cross-validated label");
            Ok(scores)
        })
        .collect()
}

/// Scores of one label.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LabelReport {
    pub label: String,
    pub cv_scores: Vec<f64>,
    pub cv_mean: f64,
    pub cv_std: f64,
    pub holdout_accuracy: f64,
    pub holdout_f1_macro: f64,
}

/// Per-label cross-validation and holdout results.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub labels: Vec<LabelReport>,
}

impl EvaluationReport {
    /// Builds the report from per-label CV scores and holdout predictions.
    ///
    /// `classes`, `cv_scores` and the columns of `y_true` / `y_pred` must line up.
    pub fn new(
        classes: &[String],
        cv_scores: Vec<Vec<f64>>,
        y_true: ArrayView2<u8>,
        y_pred: ArrayView2<u8>,
    ) -> Result<Self, EvaluationError> {
        if cv_scores.len() != classes.len() {
            return Err(EvaluationError::LengthMismatch {
                expected: classes.len(),
                got: cv_scores.len(),
            });
        }
        if y_true.dim() != y_pred.dim() || y_true.ncols() != classes.len() {
            return Err(EvaluationError::LengthMismatch {
                expected: classes.len(),
                got: y_pred.ncols(),
            });
        }

        let labels = classes
            .iter()
            .zip(cv_scores)
            .enumerate()
            .map(|(i, (label, scores))| -> Result<LabelReport, EvaluationError> {
                let (cv_mean, cv_std) = mean_std(&scores);
                Ok(LabelReport {
                    label: label.clone(),
                    cv_scores: scores,
                    cv_mean,
                    cv_std,
                    holdout_accuracy: accuracy(y_true.column(i), y_pred.column(i))?,
                    holdout_f1_macro: f1_macro(y_true.column(i), y_pred.column(i))?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { labels })
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Cross-Validation Results ===")?;
        for report in &self.labels {
            writeln!(
                f,
                "{} Accuracy: {:.3} (±{:.3})",
                report.label, report.cv_mean, report.cv_std
            )?;
        }
        writeln!(f)?;
        writeln!(f, "=== Holdout Set Evaluation ===")?;
        for report in &self.labels {
            writeln!(
                f,
                "{} → Accuracy: {:.3}, Macro-F1: {:.3}",
                report.label, report.holdout_accuracy, report.holdout_f1_macro
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    #[test]
    fn test_report_display() {
        let classes = vec!["Design".to_string(), "Python".to_string()];
        let y_true = arr2(&[[1u8, 0], [0, 1], [1, 1], [0, 0]]);
        let y_pred = arr2(&[[1u8, 0], [0, 0], [1, 1], [0, 0]]);
        let report = EvaluationReport::new(
            &classes,
            vec![vec![1.0, 0.5], vec![0.75, 0.75]],
            y_true.view(),
            y_pred.view(),
        )
        .unwrap();

        assert_eq!(report.labels[0].holdout_accuracy, 1.0);
        assert_eq!(report.labels[1].holdout_accuracy, 0.75);
        assert_eq!(report.labels[0].cv_mean, 0.75);
        assert_eq!(report.labels[0].cv_std, 0.25);

        let text = report.to_string();
        assert!(text.contains("Design Accuracy: 0.750 (±0.250)"));
        assert!(text.contains("Python → Accuracy: 0.750, Macro-F1: 0.733"));
    }

    #[test]
    fn test_report_rejects_misaligned_inputs() {
        let classes = vec!["A".to_string()];
        let y = arr2(&[[1u8], [0]]);
        let result = EvaluationReport::new(&classes, vec![], y.view(), y.view());
        assert!(matches!(result, Err(EvaluationError::LengthMismatch { .. })));
    }
}
