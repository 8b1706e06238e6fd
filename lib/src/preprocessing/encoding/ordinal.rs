//! Ordinal encoding for categorical features.
//!
//! Maps categorical values to integer ordinals (0, 1, 2, ...).

use crate::dataset::FeatureFrame;
use crate::preprocessing::encoding::{sorted_categories, HandleUnknown};
use crate::preprocessing::error::PreprocessingError;
use crate::preprocessing::traits::{FittedTransformer, Transformer};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Ordinal encoder for categorical features.
///
/// Maps each unique category to an integer ordinal (0, 1, 2, ...).
/// The mapping is learned from the training data, with categories
/// sorted numerically when every category is a number and
/// lexicographically otherwise.
///
/// # Example
/// ```ignore
/// use formation_recommender::preprocessing::{OrdinalEncoder, Transformer};
///
/// // Soft_Skills: ["Moyen", "Bon", "Excellent"]  (categories: Bon, Excellent, Moyen)
/// let fitted = OrdinalEncoder::new().fit(&frame)?;
///
/// // Output: [[2], [0], [1]]
/// let encoded = fitted.transform(&frame)?;
/// ```
#[derive(Clone, Debug, Default)]
pub struct OrdinalEncoder {
    /// How to handle unknown categories during transform.
    handle_unknown: HandleUnknown,
}

impl OrdinalEncoder {
    /// Create a new OrdinalEncoder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the strategy for handling unknown categories.
    pub fn with_handle_unknown(mut self, strategy: HandleUnknown) -> Self {
        self.handle_unknown = strategy;
        self
    }
}

/// Serializable parameters for a fitted OrdinalEncoder.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrdinalEncoderParams {
    /// Input column names, in fit order.
    pub columns: Vec<String>,
    /// Categories for each input column; a category's rank is its index.
    pub categories_: Vec<Vec<String>>,
    pub handle_unknown: HandleUnknown,
}

/// Fitted OrdinalEncoder ready for inference.
#[derive(Clone, Debug)]
pub struct FittedOrdinalEncoder {
    columns: Vec<String>,
    categories_: Vec<Vec<String>>,
    /// Category -> rank, one map per column.
    mappings_: Vec<HashMap<String, usize>>,
    handle_unknown: HandleUnknown,
}

impl FittedOrdinalEncoder {
    fn build(
        columns: Vec<String>,
        categories_: Vec<Vec<String>>,
        handle_unknown: HandleUnknown,
    ) -> Result<Self, PreprocessingError> {
        if columns.len() != categories_.len() {
            return Err(PreprocessingError::InvalidShape {
                expected: format!("{} category lists", columns.len()),
                got: format!("{}", categories_.len()),
            });
        }
        let mappings_ = categories_
            .iter()
            .map(|cats| {
                cats.iter()
                    .enumerate()
                    .map(|(rank, cat)| (cat.clone(), rank))
                    .collect()
            })
            .collect();
        Ok(Self {
            columns,
            categories_,
            mappings_,
            handle_unknown,
        })
    }

    /// Get the categories learned for each feature.
    pub fn categories(&self) -> &[Vec<String>] {
        &self.categories_
    }

    /// Get the mapping (category -> ordinal) for a specific feature.
    pub fn mapping(&self, feature_idx: usize) -> Option<&HashMap<String, usize>> {
        self.mappings_.get(feature_idx)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn n_features_out(&self) -> usize {
        self.columns.len()
    }
}

impl Transformer for OrdinalEncoder {
    type Input = FeatureFrame;
    type Output = Array2<f64>;
    type Params = OrdinalEncoderParams;
    type Fitted = FittedOrdinalEncoder;

    fn fit(&self, data: &Self::Input) -> Result<Self::Fitted, PreprocessingError> {
        if data.is_empty() {
            return Err(PreprocessingError::EmptyData(
                "Cannot fit OrdinalEncoder on empty data".to_string(),
            ));
        }

        let mut categories_ = Vec::with_capacity(data.n_columns());
        for name in data.names() {
            categories_.push(sorted_categories(name, data.require_column(name)?, false)?);
        }

        FittedOrdinalEncoder::build(data.names().to_vec(), categories_, self.handle_unknown)
    }
}

impl FittedTransformer for FittedOrdinalEncoder {
    type Input = FeatureFrame;
    type Output = Array2<f64>;
    type Params = OrdinalEncoderParams;

    fn transform(&self, data: &Self::Input) -> Result<Self::Output, PreprocessingError> {
        let mut result = Array2::<f64>::zeros((data.n_rows(), self.columns.len()));

        for (col, (name, mapping)) in self.columns.iter().zip(&self.mappings_).enumerate() {
            let cells = data.require_column(name)?;
            for (row, cell) in cells.iter().enumerate() {
                let key = cell.category();
                match key.as_ref().and_then(|k| mapping.get(k)) {
                    Some(&rank) => result[[row, col]] = rank as f64,
                    None => match (self.handle_unknown, key) {
                        (HandleUnknown::Ignore, _) => result[[row, col]] = f64::NAN,
                        (HandleUnknown::Error, Some(value)) => {
                            return Err(PreprocessingError::UnknownCategory {
                                column: name.clone(),
                                value,
                            })
                        }
                        (HandleUnknown::Error, None) => {
                            return Err(PreprocessingError::MissingValues(format!(
                                "column {} row {}",
                                name, row
                            )))
                        }
                    },
                }
            }
        }

        Ok(result)
    }

    fn extract_params(&self) -> Self::Params {
        OrdinalEncoderParams {
            columns: self.columns.clone(),
            categories_: self.categories_.clone(),
            handle_unknown: self.handle_unknown,
        }
    }

    fn from_params(params: Self::Params) -> Result<Self, PreprocessingError> {
        FittedOrdinalEncoder::build(params.columns, params.categories_, params.handle_unknown)
    }

    fn n_features_in(&self) -> usize {
        self.columns.len()
    }
}
