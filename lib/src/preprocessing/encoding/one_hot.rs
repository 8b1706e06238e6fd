//! One-hot encoding for categorical features.
//!
//! Transforms categorical columns to indicator (dummy) columns.

use crate::dataset::FeatureFrame;
use crate::preprocessing::encoding::{sorted_categories, HandleUnknown};
use crate::preprocessing::error::PreprocessingError;
use crate::preprocessing::traits::{FittedTransformer, Transformer};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Which category, if any, is left out of each indicator group.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum DropPolicy {
    /// Keep one indicator per category.
    #[default]
    None,
    /// Drop the first category of every group to avoid collinear indicators.
    First,
}

/// One-hot encoder for categorical features.
///
/// Each input column is treated as a categorical feature, and the encoder
/// learns the distinct values present in each column during fitting.
///
/// # Example
/// ```ignore
/// use formation_recommender::preprocessing::{DropPolicy, OneHotEncoder, Transformer};
///
/// let encoder = OneHotEncoder::new().with_drop(DropPolicy::First);
/// let fitted = encoder.fit(&frame)?;
/// let encoded = fitted.transform(&frame)?;
/// ```
#[derive(Clone, Debug, Default)]
pub struct OneHotEncoder {
    drop: DropPolicy,
    handle_unknown: HandleUnknown,
}

impl OneHotEncoder {
    /// Create a new OneHotEncoder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the drop policy.
    pub fn with_drop(mut self, drop: DropPolicy) -> Self {
        self.drop = drop;
        self
    }

    /// Set the strategy for handling unknown categories.
    pub fn with_handle_unknown(mut self, strategy: HandleUnknown) -> Self {
        self.handle_unknown = strategy;
        self
    }
}

/// Serializable parameters for a fitted OneHotEncoder.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OneHotEncoderParams {
    /// Input column names, in fit order.
    pub columns: Vec<String>,
    /// Categories for each input column.
    pub categories_: Vec<Vec<String>>,
    pub drop: DropPolicy,
    pub handle_unknown: HandleUnknown,
}

/// Fitted OneHotEncoder ready for inference.
#[derive(Clone, Debug)]
pub struct FittedOneHotEncoder {
    columns: Vec<String>,
    categories_: Vec<Vec<String>>,
    drop: DropPolicy,
    handle_unknown: HandleUnknown,
    /// Output width of each group after dropping.
    group_widths: Vec<usize>,
    n_features_out: usize,
}

impl FittedOneHotEncoder {
    fn build(
        columns: Vec<String>,
        categories_: Vec<Vec<String>>,
        drop: DropPolicy,
        handle_unknown: HandleUnknown,
    ) -> Result<Self, PreprocessingError> {
        if columns.len() != categories_.len() {
            return Err(PreprocessingError::InvalidShape {
                expected: format!("{} category lists", columns.len()),
                got: format!("{}", categories_.len()),
            });
        }
        let offset = usize::from(drop == DropPolicy::First);
        let group_widths: Vec<usize> = categories_
            .iter()
            .map(|cats| cats.len().saturating_sub(offset))
            .collect();
        let n_features_out = group_widths.iter().sum();
        Ok(Self {
            columns,
            categories_,
            drop,
            handle_unknown,
            group_widths,
            n_features_out,
        })
    }

    /// Get the categories learned for each column.
    pub fn categories(&self) -> &[Vec<String>] {
        &self.categories_
    }

    /// Get the number of output features.
    pub fn n_features_out(&self) -> usize {
        self.n_features_out
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Output names, `<column>_<category>` for every retained category.
    pub fn feature_names_out(&self) -> Vec<String> {
        let skip = usize::from(self.drop == DropPolicy::First);
        self.columns
            .iter()
            .zip(&self.categories_)
            .flat_map(|(col, cats)| cats.iter().skip(skip).map(move |cat| format!("{}_{}", col, cat)))
            .collect()
    }
}

impl Transformer for OneHotEncoder {
    type Input = FeatureFrame;
    type Output = Array2<f64>;
    type Params = OneHotEncoderParams;
    type Fitted = FittedOneHotEncoder;

    fn fit(&self, data: &Self::Input) -> Result<Self::Fitted, PreprocessingError> {
        if data.is_empty() {
            return Err(PreprocessingError::EmptyData(
                "Cannot fit OneHotEncoder on empty data".to_string(),
            ));
        }

        let mut categories_ = Vec::with_capacity(data.n_columns());
        for name in data.names() {
            let cells = data.require_column(name)?;
            categories_.push(sorted_categories(name, cells, true)?);
        }

        FittedOneHotEncoder::build(
            data.names().to_vec(),
            categories_,
            self.drop,
            self.handle_unknown,
        )
    }
}

impl FittedTransformer for FittedOneHotEncoder {
    type Input = FeatureFrame;
    type Output = Array2<f64>;
    type Params = OneHotEncoderParams;

    fn transform(&self, data: &Self::Input) -> Result<Self::Output, PreprocessingError> {
        let rows = data.n_rows();
        let mut result = Array2::<f64>::zeros((rows, self.n_features_out));
        let dropped = usize::from(self.drop == DropPolicy::First);

        let mut out_offset = 0;
        for ((name, cats), &width) in self.columns.iter().zip(&self.categories_).zip(&self.group_widths) {
            let cells = data.require_column(name)?;
            for (row, cell) in cells.iter().enumerate() {
                let key = cell.category();
                match key.as_deref().and_then(|k| cats.iter().position(|c| c == k)) {
                    Some(idx) if idx >= dropped => {
                        result[[row, out_offset + idx - dropped]] = 1.0;
                    }
                    // The dropped category encodes as an all-zero group.
                    Some(_) => {}
                    None => {
                        if self.handle_unknown == HandleUnknown::Error {
                            return match key {
                                Some(value) => Err(PreprocessingError::UnknownCategory {
                                    column: name.clone(),
                                    value,
                                }),
                                None => Err(PreprocessingError::MissingValues(format!(
                                    "column {} row {}",
                                    name, row
                                ))),
                            };
                        }
                    }
                }
            }
            out_offset += width;
        }

        Ok(result)
    }

    fn extract_params(&self) -> Self::Params {
        OneHotEncoderParams {
            columns: self.columns.clone(),
            categories_: self.categories_.clone(),
            drop: self.drop,
            handle_unknown: self.handle_unknown,
        }
    }

    fn from_params(params: Self::Params) -> Result<Self, PreprocessingError> {
        FittedOneHotEncoder::build(
            params.columns,
            params.categories_,
            params.drop,
            params.handle_unknown,
        )
    }

    fn n_features_in(&self) -> usize {
        self.columns.len()
    }
}
