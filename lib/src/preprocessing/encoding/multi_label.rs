//! Multi-label target encoding.
//!
//! Maps variable-length label lists to a multi-hot matrix with one column per
//! known label, and back.

use crate::preprocessing::error::PreprocessingError;
use crate::preprocessing::traits::{FittedTransformer, Transformer};
use ndarray::{Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::warn;

/// Multi-label binarizer for target label lists.
///
/// Classes are the sorted union of every label seen at fit time. Column `j`
/// of the output matrix is 1 when the row carries `classes()[j]`.
///
/// # Example
/// ```ignore
/// use formation_recommender::preprocessing::{MultiLabelBinarizer, Transformer};
///
/// let labels = vec![vec!["Python".to_string()], vec!["Design".to_string(), "Python".to_string()]];
/// let fitted = MultiLabelBinarizer::new().fit(&labels)?;
///
/// // classes: [Design, Python]
/// // Output: [[0, 1], [1, 1]]
/// let y = fitted.transform(&labels)?;
/// ```
#[derive(Clone, Debug, Default)]
pub struct MultiLabelBinarizer;

impl MultiLabelBinarizer {
    pub fn new() -> Self {
        Self
    }
}

/// Serializable parameters for a fitted MultiLabelBinarizer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MultiLabelBinarizerParams {
    /// Sorted label vocabulary.
    pub classes_: Vec<String>,
}

/// Fitted MultiLabelBinarizer.
#[derive(Clone, Debug)]
pub struct FittedMultiLabelBinarizer {
    classes_: Vec<String>,
    class_to_idx: HashMap<String, usize>,
}

impl FittedMultiLabelBinarizer {
    fn build(classes_: Vec<String>) -> Result<Self, PreprocessingError> {
        let class_to_idx: HashMap<String, usize> = classes_
            .iter()
            .enumerate()
            .map(|(idx, c)| (c.clone(), idx))
            .collect();
        if class_to_idx.len() != classes_.len() {
            return Err(PreprocessingError::InvalidParameter(
                "duplicate label in binarizer classes".to_string(),
            ));
        }
        Ok(Self {
            classes_,
            class_to_idx,
        })
    }

    /// Label vocabulary; index `j` names output column `j`.
    pub fn classes(&self) -> &[String] {
        &self.classes_
    }

    pub fn n_classes(&self) -> usize {
        self.classes_.len()
    }

    /// Labels whose indicator is set, in class order.
    pub fn inverse_transform(&self, row: ArrayView1<u8>) -> Result<Vec<String>, PreprocessingError> {
        if row.len() != self.classes_.len() {
            return Err(PreprocessingError::FeatureMismatch {
                expected_features: self.classes_.len(),
                got_features: row.len(),
            });
        }
        Ok(row
            .iter()
            .zip(&self.classes_)
            .filter(|(&flag, _)| flag != 0)
            .map(|(_, class)| class.clone())
            .collect())
    }

    /// Row-wise [`FittedMultiLabelBinarizer::inverse_transform`].
    pub fn inverse_transform_matrix(
        &self,
        matrix: ArrayView2<u8>,
    ) -> Result<Vec<Vec<String>>, PreprocessingError> {
        matrix
            .rows()
            .into_iter()
            .map(|row| self.inverse_transform(row))
            .collect()
    }
}

impl Transformer for MultiLabelBinarizer {
    type Input = [Vec<String>];
    type Output = Array2<u8>;
    type Params = MultiLabelBinarizerParams;
    type Fitted = FittedMultiLabelBinarizer;

    fn fit(&self, data: &Self::Input) -> Result<Self::Fitted, PreprocessingError> {
        let classes: BTreeSet<&String> = data.iter().flatten().collect();
        if classes.is_empty() {
            return Err(PreprocessingError::EmptyData(
                "Cannot fit MultiLabelBinarizer without any label".to_string(),
            ));
        }
        FittedMultiLabelBinarizer::build(classes.into_iter().cloned().collect())
    }
}

impl FittedTransformer for FittedMultiLabelBinarizer {
    type Input = [Vec<String>];
    type Output = Array2<u8>;
    type Params = MultiLabelBinarizerParams;

    fn transform(&self, data: &Self::Input) -> Result<Self::Output, PreprocessingError> {
        let mut result = Array2::<u8>::zeros((data.len(), self.classes_.len()));
        for (row, labels) in data.iter().enumerate() {
            for label in labels {
                match self.class_to_idx.get(label) {
                    Some(&idx) => result[[row, idx]] = 1,
                    None => warn!(label = %label, row, "ignoring label unknown to the binarizer"),
                }
            }
        }
        Ok(result)
    }

    fn extract_params(&self) -> Self::Params {
        MultiLabelBinarizerParams {
            classes_: self.classes_.clone(),
        }
    }

    fn from_params(params: Self::Params) -> Result<Self, PreprocessingError> {
        FittedMultiLabelBinarizer::build(params.classes_)
    }

    fn n_features_in(&self) -> usize {
        self.classes_.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    fn lists(raw: &[&[&str]]) -> Vec<Vec<String>> {
        raw.iter()
            .map(|row| row.iter().map(|s| s.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_binarizer_sorted_classes() {
        let y = lists(&[&["Python", "Design"], &["Marketing"], &["Design"]]);
        let fitted = MultiLabelBinarizer::new().fit(&y).unwrap();
        assert_eq!(fitted.classes(), &["Design", "Marketing", "Python"]);

        let encoded = fitted.transform(&y).unwrap();
        assert_eq!(encoded, arr2(&[[1u8, 0, 1], [0, 1, 0], [1, 0, 0]]));
    }

    #[test]
    fn test_binarizer_unknown_labels_ignored() {
        let fitted = MultiLabelBinarizer::new()
            .fit(&lists(&[&["A"], &["B"]]))
            .unwrap();
        let encoded = fitted.transform(&lists(&[&["B", "Z"]])).unwrap();
        assert_eq!(encoded, arr2(&[[0u8, 1]]));
    }

    #[test]
    fn test_binarizer_inverse_transform() {
        let y = lists(&[&["Python", "Design"], &["Marketing"]]);
        let fitted = MultiLabelBinarizer::new().fit(&y).unwrap();
        let encoded = fitted.transform(&y).unwrap();

        let decoded = fitted.inverse_transform_matrix(encoded.view()).unwrap();
        assert_eq!(decoded, lists(&[&["Design", "Python"], &["Marketing"]]));
        assert!(fitted
            .inverse_transform(ndarray::arr1(&[1u8, 0]).view())
            .is_err());
    }

    #[test]
    fn test_binarizer_empty_fit() {
        let y: Vec<Vec<String>> = vec![vec![], vec![]];
        assert!(matches!(
            MultiLabelBinarizer::new().fit(&y),
            Err(PreprocessingError::EmptyData(_))
        ));
    }

    #[test]
    fn test_binarizer_params_round_trip() {
        let fitted = MultiLabelBinarizer::new()
            .fit(&lists(&[&["b", "a"]]))
            .unwrap();
        let restored = FittedMultiLabelBinarizer::from_params(fitted.extract_params()).unwrap();
        assert_eq!(restored.classes(), fitted.classes());

        let dup = MultiLabelBinarizerParams {
            classes_: vec!["a".into(), "a".into()],
        };
        assert!(FittedMultiLabelBinarizer::from_params(dup).is_err());
    }
}
