//! K-fold cross-validated accuracy of a binary classifier.

use crate::evaluation::{accuracy, EvaluationError, StratifiedKFold};
use crate::model::{Classifier, ProbabilisticClassifier};
use ndarray::{ArrayView1, ArrayView2, Axis};
use rayon::prelude::*;
use tracing::debug;

/// Accuracy on each held-out fold, in fold order.
///
/// Folds are fit independently and in parallel; each one owns its own slices of
/// `x` and `y`, so the scores do not depend on scheduling.
pub fn cross_val_score<C: Classifier>(
    estimator: &C,
    x: ArrayView2<f64>,
    y: ArrayView1<u8>,
    cv: &StratifiedKFold,
) -> Result<Vec<f64>, EvaluationError> {
    if x.nrows() != y.len() {
        return Err(EvaluationError::LengthMismatch {
            expected: x.nrows(),
            got: y.len(),
        });
    }
    let labels = y.to_vec();
    let folds = cv.split(&labels)?;

    folds
        .par_iter()
        .enumerate()
        .map(|(fold, (train, test))| -> Result<f64, EvaluationError> {
            let fitted = estimator.fit(
                x.select(Axis(0), train).view(),
                y.select(Axis(0), train).view(),
            )?;
            let y_test = y.select(Axis(0), test);
            let y_pred = fitted.predict(x.select(Axis(0), test).view())?;
            let score = accuracy(y_test.view(), y_pred.view())?;
            debug!(fold, train = train.len(), test = test.len(), score, "cv fold");
            Ok(score)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LogisticRegression;
    use ndarray::{Array1, Array2};

    fn separable(n: usize) -> (Array2<f64>, Array1<u8>) {
        let x = Array2::from_shape_fn((n, 1), |(i, _)| i as f64 / n as f64);
        let y = x.column(0).mapv(|v| u8::from(v >= 0.5));
        (x, y)
    }

    #[test]
    fn test_cross_val_score_one_score_per_fold() {
        let (x, y) = separable(40);
        let cv = StratifiedKFold::new(5).with_shuffle(42);
        let scores =
            cross_val_score(&LogisticRegression::default().with_c(100.0), x.view(), y.view(), &cv)
                .unwrap();
        assert_eq!(scores.len(), 5);
        assert!(scores.iter().all(|s| (0.0..=1.0).contains(s)));
        assert!(scores.iter().sum::<f64>() / 5.0 > 0.8);
    }

    #[test]
    fn test_cross_val_score_is_repeatable() {
        let (x, y) = separable(30);
        let cv = StratifiedKFold::new(3).with_shuffle(7);
        let model = LogisticRegression::default();
        let a = cross_val_score(&model, x.view(), y.view(), &cv).unwrap();
        let b = cross_val_score(&model, x.view(), y.view(), &cv).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_cross_val_score_length_mismatch() {
        let (x, _) = separable(10);
        let y = Array1::<u8>::zeros(9);
        let result = cross_val_score(
            &LogisticRegression::default(),
            x.view(),
            y.view(),
            &StratifiedKFold::new(2),
        );
        assert!(matches!(result, Err(EvaluationError::LengthMismatch { .. })));
    }
}
