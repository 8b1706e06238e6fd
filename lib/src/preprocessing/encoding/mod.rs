//! Categorical feature encoding transformers.
//!
//! # Available Encoders
//!
//! ## OneHotEncoder
//! Converts each categorical column to indicator columns, optionally dropping
//! the first category of every group (`k - 1` encoding).
//!
//! ```ignore
//! // Column Sexe with categories [F, M], drop first:
//! // F -> [0], M -> [1]
//! ```
//!
//! ## OrdinalEncoder
//! Maps categories to their rank (0, 1, 2, ...) in the fit-time order.
//!
//! ## MultiLabelBinarizer
//! Turns variable-length label lists into a fixed-width multi-hot matrix.
//!
//! # Category order
//!
//! Categories are learned from [`Cell::category`] keys. When every key of a
//! column parses as a number, the order is numeric (`2 < 10`); otherwise it is
//! lexicographic. The order is stored in the fitted parameters and never
//! re-derived.

mod multi_label;
mod one_hot;
mod ordinal;

pub use multi_label::{FittedMultiLabelBinarizer, MultiLabelBinarizer, MultiLabelBinarizerParams};
pub use one_hot::{DropPolicy, FittedOneHotEncoder, OneHotEncoder, OneHotEncoderParams};
pub use ordinal::{FittedOrdinalEncoder, OrdinalEncoder, OrdinalEncoderParams};

use crate::dataset::Cell;
use crate::preprocessing::error::PreprocessingError;
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Strategy for handling unknown categories during transform.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum HandleUnknown {
    /// Raise an error when unknown categories are encountered.
    #[default]
    Error,
    /// Ignore unknown categories (all-zero group for one-hot, NaN for ordinal).
    Ignore,
}

/// Distinct categories of one column in their canonical order.
///
/// Missing cells are skipped when `skip_missing` is set and rejected otherwise.
pub(crate) fn sorted_categories(
    column: &str,
    cells: &[Cell],
    skip_missing: bool,
) -> Result<Vec<String>, PreprocessingError> {
    let mut unique = BTreeSet::new();
    for (row, cell) in cells.iter().enumerate() {
        match cell.category() {
            Some(key) => {
                unique.insert(key);
            }
            None if skip_missing => {}
            None => {
                return Err(PreprocessingError::MissingValues(format!(
                    "column {} row {}",
                    column, row
                )))
            }
        }
    }

    let mut categories: Vec<String> = unique.into_iter().collect();
    let numeric: Option<Vec<f64>> = categories.iter().map(|c| c.parse::<f64>().ok()).collect();
    if let Some(values) = numeric {
        let mut paired: Vec<(f64, String)> = values.into_iter().zip(categories).collect();
        paired.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
        categories = paired.into_iter().map(|(_, c)| c).collect();
    }
    Ok(categories)
}
