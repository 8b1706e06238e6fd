//! Classification metrics for hard 0/1 predictions.

use crate::evaluation::EvaluationError;
use ndarray::ArrayView1;
use std::collections::BTreeSet;

fn check_lengths(y_true: ArrayView1<u8>, y_pred: ArrayView1<u8>) -> Result<(), EvaluationError> {
    if y_true.len() != y_pred.len() {
        return Err(EvaluationError::LengthMismatch {
            expected: y_true.len(),
            got: y_pred.len(),
        });
    }
    if y_true.is_empty() {
        return Err(EvaluationError::Empty);
    }
    Ok(())
}

/// Fraction of rows where prediction equals truth.
pub fn accuracy(y_true: ArrayView1<u8>, y_pred: ArrayView1<u8>) -> Result<f64, EvaluationError> {
    check_lengths(y_true, y_pred)?;
    let hits = y_true.iter().zip(y_pred.iter()).filter(|(t, p)| t == p).count();
    Ok(hits as f64 / y_true.len() as f64)
}

/// Unweighted mean of per-class F1 over every class present in truth or prediction.
///
/// A class with no true and no predicted positives scores 0.
pub fn f1_macro(y_true: ArrayView1<u8>, y_pred: ArrayView1<u8>) -> Result<f64, EvaluationError> {
    check_lengths(y_true, y_pred)?;
    let classes: BTreeSet<u8> = y_true.iter().chain(y_pred.iter()).copied().collect();

    let total: f64 = classes
        .iter()
        .map(|&class| {
            let (mut tp, mut fp, mut fn_) = (0usize, 0usize, 0usize);
            for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
                match (t == class, p == class) {
                    (true, true) => tp += 1,
                    (false, true) => fp += 1,
                    (true, false) => fn_ += 1,
                    (false, false) => {}
                }
            }
            let denom = 2 * tp + fp + fn_;
            if denom == 0 {
                0.0
            } else {
                2.0 * tp as f64 / denom as f64
            }
        })
        .sum();
    Ok(total / classes.len() as f64)
}

/// Mean and population standard deviation. Empty input gives `(NaN, NaN)`.
pub fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (f64::NAN, f64::NAN);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr1;

    #[test]
    fn test_accuracy() {
        let y_true = arr1(&[1u8, 0, 1, 1]);
        let y_pred = arr1(&[1u8, 1, 1, 0]);
        assert_eq!(accuracy(y_true.view(), y_pred.view()).unwrap(), 0.5);
    }

    #[test]
    fn test_f1_macro_two_classes() {
        let y_true = arr1(&[1u8, 0, 1, 1]);
        let y_pred = arr1(&[1u8, 1, 1, 0]);
        // class 1: tp=2 fp=1 fn=1 -> 4/6; class 0: tp=0 fp=1 fn=1 -> 0
        let f1 = f1_macro(y_true.view(), y_pred.view()).unwrap();
        assert!((f1 - (2.0 / 3.0) / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_f1_macro_single_class_perfect() {
        let y = arr1(&[0u8, 0, 0]);
        assert_eq!(f1_macro(y.view(), y.view()).unwrap(), 1.0);
    }

    #[test]
    fn test_metric_length_errors() {
        let a = arr1(&[1u8, 0]);
        let b = arr1(&[1u8]);
        assert!(matches!(
            accuracy(a.view(), b.view()),
            Err(EvaluationError::LengthMismatch { expected: 2, got: 1 })
        ));
        let empty = arr1::<u8>(&[]);
        assert!(matches!(
            f1_macro(empty.view(), empty.view()),
            Err(EvaluationError::Empty)
        ));
    }

    #[test]
    fn test_mean_std_population() {
        let (mean, std) = mean_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(mean, 5.0);
        assert_eq!(std, 2.0);
        assert!(mean_std(&[]).0.is_nan());
    }
}
