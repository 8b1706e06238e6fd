//! Min-Max Scaler.
//!
//! Transforms features by scaling each feature to a given range (default [0, 1]).
//!
//! The transformation is given by:
//! ```text
//! X_scaled = (X - X_min) / (X_max - X_min) * (max - min) + min
//! ```
//!
//! Values outside the fit-time range are not clipped, so unseen extremes map
//! outside the target range.
//!
//! # Example
//! ```ignore
//! use formation_recommender::preprocessing::{MinMaxScaler, Transformer};
//!
//! let scaler = MinMaxScaler::new().with_range(0.0, 1.0);
//!
//! let fitted = scaler.fit(&frame)?;
//! let scaled = fitted.transform(&frame)?;
//! ```

use crate::dataset::{Cell, FeatureFrame};
use crate::preprocessing::error::PreprocessingError;
use crate::preprocessing::traits::{FittedTransformer, Transformer};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Configuration for MinMaxScaler.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScalerConfig {
    /// Minimum value of the target range.
    pub min: f64,
    /// Maximum value of the target range.
    pub max: f64,
}

impl Default for MinMaxScalerConfig {
    fn default() -> Self {
        Self { min: 0.0, max: 1.0 }
    }
}

/// Serializable parameters for a fitted MinMaxScaler.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScalerParams {
    /// Configuration options.
    pub config: MinMaxScalerConfig,
    /// Input column names, in fit order.
    pub columns: Vec<String>,
    /// Minimum of each feature.
    pub min_: Vec<f64>,
    /// Maximum of each feature.
    pub max_: Vec<f64>,
    /// Scale factor for each feature: (max - min) / (feature_max - feature_min).
    pub scale_: Vec<f64>,
}

/// MinMaxScaler transformer (unfitted).
#[derive(Clone, Debug, Default)]
pub struct MinMaxScaler {
    config: MinMaxScalerConfig,
}

impl MinMaxScaler {
    /// Create a new MinMaxScaler with default range [0, 1].
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the target range for scaling. `max` must exceed `min`; this is
    /// checked at fit time.
    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.config.min = min;
        self.config.max = max;
        self
    }
}

/// Numeric value of a cell, or the error naming why it has none.
fn numeric_value(column: &str, row: usize, cell: &Cell) -> Result<f64, PreprocessingError> {
    match cell {
        Cell::Missing => Err(PreprocessingError::MissingValues(format!(
            "column {} row {}",
            column, row
        ))),
        other => other.as_f64().ok_or_else(|| PreprocessingError::InvalidNumber {
            column: column.to_string(),
            value: other.to_string(),
        }),
    }
}

impl Transformer for MinMaxScaler {
    type Input = FeatureFrame;
    type Output = Array2<f64>;
    type Params = MinMaxScalerParams;
    type Fitted = FittedMinMaxScaler;

    fn fit(&self, data: &Self::Input) -> Result<Self::Fitted, PreprocessingError> {
        if data.is_empty() {
            return Err(PreprocessingError::EmptyData(
                "Cannot fit MinMaxScaler on empty data".to_string(),
            ));
        }
        if self.config.max <= self.config.min {
            return Err(PreprocessingError::InvalidParameter(format!(
                "max ({}) must be greater than min ({})",
                self.config.max, self.config.min
            )));
        }

        let n_cols = data.n_columns();
        let mut min_ = Vec::with_capacity(n_cols);
        let mut max_ = Vec::with_capacity(n_cols);
        for name in data.names() {
            let mut lo = f64::INFINITY;
            let mut hi = f64::NEG_INFINITY;
            for (row, cell) in data.require_column(name)?.iter().enumerate() {
                let v = numeric_value(name, row, cell)?;
                lo = lo.min(v);
                hi = hi.max(v);
            }
            min_.push(lo);
            max_.push(hi);
        }

        // Compute scale: (target_max - target_min) / (feature_max - feature_min)
        let target_range = self.config.max - self.config.min;
        let scale_ = min_
            .iter()
            .zip(&max_)
            .map(|(&min, &max)| {
                let range = max - min;
                if range == 0.0 {
                    1.0 // Constant feature: scale by 1 to avoid division by zero
                } else {
                    target_range / range
                }
            })
            .collect();

        Ok(FittedMinMaxScaler {
            config: self.config.clone(),
            columns: data.names().to_vec(),
            min_,
            max_,
            scale_,
        })
    }
}

/// Fitted MinMaxScaler ready for inference.
#[derive(Clone, Debug)]
pub struct FittedMinMaxScaler {
    config: MinMaxScalerConfig,
    columns: Vec<String>,
    min_: Vec<f64>,
    max_: Vec<f64>,
    scale_: Vec<f64>,
}

impl FittedMinMaxScaler {
    /// Get the minimum values for each feature.
    pub fn min(&self) -> &[f64] {
        &self.min_
    }

    /// Get the scale factor for each feature.
    pub fn scale(&self) -> &[f64] {
        &self.scale_
    }

    /// Get the data range (max - min) for each feature.
    pub fn data_range(&self) -> Vec<f64> {
        self.max_.iter().zip(&self.min_).map(|(max, min)| max - min).collect()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Map scaled values back to the original units.
    pub fn inverse_transform(&self, data: &Array2<f64>) -> Result<Array2<f64>, PreprocessingError> {
        if data.ncols() != self.columns.len() {
            return Err(PreprocessingError::FeatureMismatch {
                expected_features: self.columns.len(),
                got_features: data.ncols(),
            });
        }
        let mut result = data.clone();
        for (j, mut col) in result.columns_mut().into_iter().enumerate() {
            col.mapv_inplace(|v| (v - self.config.min) / self.scale_[j] + self.min_[j]);
        }
        Ok(result)
    }
}

impl FittedTransformer for FittedMinMaxScaler {
    type Input = FeatureFrame;
    type Output = Array2<f64>;
    type Params = MinMaxScalerParams;

    fn transform(&self, data: &Self::Input) -> Result<Self::Output, PreprocessingError> {
        let mut result = Array2::<f64>::zeros((data.n_rows(), self.columns.len()));

        // X_scaled = (X - X_min) * scale_ + target_min
        for (j, name) in self.columns.iter().enumerate() {
            for (row, cell) in data.require_column(name)?.iter().enumerate() {
                let v = numeric_value(name, row, cell)?;
                result[[row, j]] = (v - self.min_[j]) * self.scale_[j] + self.config.min;
            }
        }

        Ok(result)
    }

    fn extract_params(&self) -> Self::Params {
        MinMaxScalerParams {
            config: self.config.clone(),
            columns: self.columns.clone(),
            min_: self.min_.clone(),
            max_: self.max_.clone(),
            scale_: self.scale_.clone(),
        }
    }

    fn from_params(params: Self::Params) -> Result<Self, PreprocessingError> {
        let n = params.columns.len();
        if params.min_.len() != n || params.max_.len() != n || params.scale_.len() != n {
            return Err(PreprocessingError::InvalidShape {
                expected: format!("{} values per statistic", n),
                got: format!(
                    "min {}, max {}, scale {}",
                    params.min_.len(),
                    params.max_.len(),
                    params.scale_.len()
                ),
            });
        }
        Ok(Self {
            config: params.config,
            columns: params.columns,
            min_: params.min_,
            max_: params.max_,
            scale_: params.scale_,
        })
    }

    fn n_features_in(&self) -> usize {
        self.columns.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_data() -> FeatureFrame {
        // [[0, 1], [0, 1], [1, 3]]
        FeatureFrame::new()
            .with_column("Autres_Clubs", vec![0.0.into(), 0.0.into(), 1.0.into()])
            .unwrap()
            .with_column("Projets_Realises", vec![1.0.into(), 1.0.into(), 3.0.into()])
            .unwrap()
    }

    #[test]
    fn test_minmax_scaler_fit() {
        let fitted = MinMaxScaler::new().fit(&create_test_data()).unwrap();

        // Min: [0, 1], Max: [1, 3]
        assert_eq!(fitted.min(), &[0.0, 1.0]);

        // Scale: 1 / (1 - 0) = 1, 1 / (3 - 1) = 0.5
        let scale = fitted.scale();
        assert!((scale[0] - 1.0).abs() < 1e-10);
        assert!((scale[1] - 0.5).abs() < 1e-10);
    }

    #[test]
    fn test_minmax_scaler_transform() {
        let data = create_test_data();
        let transformed = MinMaxScaler::new().fit_transform(&data).unwrap();

        // Both columns map to [0, 0, 1]
        for col in transformed.columns() {
            assert!((col[0] - 0.0).abs() < 1e-6);
            assert!((col[1] - 0.0).abs() < 1e-6);
            assert!((col[2] - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_minmax_scaler_does_not_clip() {
        let fitted = MinMaxScaler::new().fit(&create_test_data()).unwrap();
        let unseen = FeatureFrame::new()
            .with_column("Autres_Clubs", vec![3.0.into()])
            .unwrap()
            .with_column("Projets_Realises", vec![0.0.into()])
            .unwrap();
        let transformed = fitted.transform(&unseen).unwrap();
        assert!((transformed[[0, 0]] - 3.0).abs() < 1e-12);
        assert!((transformed[[0, 1]] + 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_minmax_scaler_inverse_transform() {
        let data = create_test_data();
        let fitted = MinMaxScaler::new().fit(&data).unwrap();

        let transformed = fitted.transform(&data).unwrap();
        let recovered = fitted.inverse_transform(&transformed).unwrap();

        assert_eq!(recovered.column(1).to_vec(), vec![1.0, 1.0, 3.0]);
        assert!(fitted
            .inverse_transform(&Array2::zeros((1, 3)))
            .is_err());
    }

    #[test]
    fn test_minmax_scaler_custom_range() {
        let fitted = MinMaxScaler::new()
            .with_range(-1.0, 1.0)
            .fit(&create_test_data())
            .unwrap();
        let transformed = fitted.transform(&create_test_data()).unwrap();

        // First column: [0, 0, 1] -> [-1, -1, 1]
        assert!((transformed[[0, 0]] + 1.0).abs() < 1e-6);
        assert!((transformed[[2, 0]] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_minmax_scaler_invalid_range() {
        let result = MinMaxScaler::new().with_range(1.0, 1.0).fit(&create_test_data());
        assert!(matches!(result, Err(PreprocessingError::InvalidParameter(_))));
    }

    #[test]
    fn test_minmax_scaler_zero_range() {
        // All values the same - range is 0
        let data = FeatureFrame::new()
            .with_column("Age", vec![5.0.into(), 5.0.into()])
            .unwrap();
        let fitted = MinMaxScaler::new().fit(&data).unwrap();

        assert_eq!(fitted.scale(), &[1.0]);
        let transformed = fitted.transform(&data).unwrap();
        assert!(transformed.iter().all(|&v| v.abs() < 1e-12));
    }

    #[test]
    fn test_minmax_scaler_rejects_text_and_missing() {
        let text = FeatureFrame::new()
            .with_column("Age", vec![Cell::from("twenty")])
            .unwrap();
        assert!(matches!(
            MinMaxScaler::new().fit(&text),
            Err(PreprocessingError::InvalidNumber { .. })
        ));

        let fitted = MinMaxScaler::new()
            .fit(&FeatureFrame::new().with_column("Age", vec![20.0.into()]).unwrap())
            .unwrap();
        let missing = FeatureFrame::new().with_column("Age", vec![Cell::Missing]).unwrap();
        assert!(matches!(
            fitted.transform(&missing),
            Err(PreprocessingError::MissingValues(_))
        ));
    }

    #[test]
    fn test_minmax_scaler_numeric_text_is_accepted() {
        let fitted = MinMaxScaler::new()
            .fit(&FeatureFrame::new().with_column("Age", vec![18.0.into(), 22.0.into()]).unwrap())
            .unwrap();
        let request = FeatureFrame::new().with_column("Age", vec![Cell::from("20")]).unwrap();
        assert!((fitted.transform(&request).unwrap()[[0, 0]] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_minmax_scaler_empty_data() {
        let data = FeatureFrame::new().with_column("Age", vec![]).unwrap();
        assert!(MinMaxScaler::new().fit(&data).is_err());
    }

    #[test]
    fn test_minmax_scaler_save_load_file() {
        let data = create_test_data();
        let fitted = MinMaxScaler::new().fit(&data).unwrap();

        let temp = tempfile::NamedTempFile::new().unwrap();
        fitted.save_to_file(temp.path()).unwrap();
        let loaded = FittedMinMaxScaler::load_from_file(temp.path()).unwrap();

        assert_eq!(loaded.n_features_in(), 2);
        assert_eq!(loaded.transform(&data).unwrap(), fitted.transform(&data).unwrap());
        assert_eq!(loaded.data_range(), vec![1.0, 2.0]);
    }
}
