//! Versioned, self-validating store for a trained recommender.
//!
//! A bundle holds everything inference needs: the fitted feature pipeline,
//! the per-label stacked model, the label binarizer, the input column
//! order the pipeline was fit with, and the default number of workshops to
//! recommend. It is written once after training and
//! only ever read afterwards.
//!
//! # File layout
//!
//! ```text
//! offset  size  content
//! 0       8     magic "FRMBNDL1"
//! 8       4     schema version, u32 little-endian
//! 12      8     payload length, u64 little-endian
//! 20      n     bincode payload
//! ```
//!
//! Every payload field is optional on the wire so that a bundle written by a
//! different build reports exactly which part is missing instead of a generic
//! decode failure.

use crate::model::{
    FittedMultiOutputClassifier, FittedStackingClassifier, MultiOutputParams, StackingParams,
};
use crate::predict::DEFAULT_TOP_K;
use crate::preprocessing::{
    ColumnTransformerParams, FittedColumnTransformer, FittedMultiLabelBinarizer, FittedTransformer,
    MultiLabelBinarizerParams,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

pub const BUNDLE_MAGIC: &[u8; 8] = b"FRMBNDL1";
pub const SCHEMA_VERSION: u32 = 1;
const HEADER_LEN: usize = 8 + 4 + 8;

/// The multi-label model stored in a bundle.
pub type BundleModel = FittedMultiOutputClassifier<FittedStackingClassifier>;

#[derive(Debug, Error)]
pub enum BundleError {
    #[error("bundle not found: {0}")]
    NotFound(PathBuf),
    #[error("bundle I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("bundle is truncated: expected {expected} bytes, found {found}")]
    Truncated { expected: usize, found: usize },
    #[error("not a model bundle (bad magic)")]
    BadMagic,
    #[error("bundle schema version {found} is not supported (expected {expected})")]
    IncompatibleVersion { found: u32, expected: u32 },
    #[error("bundle is missing {0}")]
    MissingField(&'static str),
    #[error("corrupt bundle: {0}")]
    Corrupt(String),
    #[error("inconsistent bundle: {0}")]
    Inconsistent(String),
}

#[derive(Serialize, Deserialize)]
struct RawBundle {
    preprocessor: Option<ColumnTransformerParams>,
    model: Option<MultiOutputParams<StackingParams>>,
    label_binarizer: Option<MultiLabelBinarizerParams>,
    feature_order: Option<Vec<String>>,
    top_k: Option<usize>,
}

/// Fitted preprocessor, model and label binarizer, validated against each other.
#[derive(Clone, Debug)]
pub struct ModelBundle {
    schema_version: u32,
    preprocessor: FittedColumnTransformer,
    model: BundleModel,
    label_binarizer: FittedMultiLabelBinarizer,
    feature_order: Vec<String>,
    top_k: usize,
}

impl ModelBundle {
    /// Assembles a bundle from freshly fitted parts.
    ///
    /// The feature order is taken from the preprocessor; the default top-k is
    /// [`DEFAULT_TOP_K`] until [`ModelBundle::with_top_k`] changes it.
    pub fn new(
        preprocessor: FittedColumnTransformer,
        model: BundleModel,
        label_binarizer: FittedMultiLabelBinarizer,
    ) -> Result<Self, BundleError> {
        let feature_order = preprocessor.input_columns();
        let bundle = Self {
            schema_version: SCHEMA_VERSION,
            preprocessor,
            model,
            label_binarizer,
            feature_order,
            top_k: DEFAULT_TOP_K,
        };
        bundle.check_consistency()?;
        Ok(bundle)
    }

    /// Sets how many workshops a recommendation returns by default.
    pub fn with_top_k(mut self, top_k: usize) -> Result<Self, BundleError> {
        self.top_k = top_k;
        self.check_consistency()?;
        Ok(self)
    }

    pub fn schema_version(&self) -> u32 {
        self.schema_version
    }

    pub fn preprocessor(&self) -> &FittedColumnTransformer {
        &self.preprocessor
    }

    pub fn model(&self) -> &BundleModel {
        &self.model
    }

    pub fn label_binarizer(&self) -> &FittedMultiLabelBinarizer {
        &self.label_binarizer
    }

    /// Input columns in the order the preprocessor was fit with.
    pub fn feature_order(&self) -> &[String] {
        &self.feature_order
    }

    /// Number of workshops recommended when the caller does not ask for one.
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    fn check_consistency(&self) -> Result<(), BundleError> {
        if self.top_k == 0 {
            return Err(BundleError::Inconsistent("top_k must be at least 1".to_string()));
        }
        if self.feature_order != self.preprocessor.input_columns() {
            return Err(BundleError::Inconsistent(
                "feature order differs from the preprocessor's input columns".to_string(),
            ));
        }
        if self.model.n_outputs() != self.label_binarizer.n_classes() {
            return Err(BundleError::Inconsistent(format!(
                "model predicts {} labels, binarizer knows {}",
                self.model.n_outputs(),
                self.label_binarizer.n_classes()
            )));
        }
        if self.model.n_features() != self.preprocessor.n_features_out() {
            return Err(BundleError::Inconsistent(format!(
                "model expects {} features, preprocessor produces {}",
                self.model.n_features(),
                self.preprocessor.n_features_out()
            )));
        }
        Ok(())
    }

    /// Encodes the bundle in the on-disk layout.
    pub fn to_bytes(&self) -> Result<Vec<u8>, BundleError> {
        let raw = RawBundle {
            preprocessor: Some(self.preprocessor.extract_params()),
            model: Some(self.model.extract_params()),
            label_binarizer: Some(self.label_binarizer.extract_params()),
            feature_order: Some(self.feature_order.clone()),
            top_k: Some(self.top_k),
        };
        let payload = bincode::serialize(&raw).map_err(|e| BundleError::Corrupt(e.to_string()))?;

        let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
        bytes.extend_from_slice(BUNDLE_MAGIC);
        bytes.extend_from_slice(&self.schema_version.to_le_bytes());
        bytes.extend_from_slice(&(payload.len() as u64).to_le_bytes());
        bytes.extend_from_slice(&payload);
        Ok(bytes)
    }

    /// Decodes and validates a bundle.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, BundleError> {
        if bytes.len() < BUNDLE_MAGIC.len() {
            return Err(BundleError::Truncated {
                expected: HEADER_LEN,
                found: bytes.len(),
            });
        }
        if &bytes[..8] != BUNDLE_MAGIC {
            return Err(BundleError::BadMagic);
        }
        if bytes.len() < HEADER_LEN {
            return Err(BundleError::Truncated {
                expected: HEADER_LEN,
                found: bytes.len(),
            });
        }

        let mut version = [0u8; 4];
        version.copy_from_slice(&bytes[8..12]);
        let version = u32::from_le_bytes(version);
        if version != SCHEMA_VERSION {
            return Err(BundleError::IncompatibleVersion {
                found: version,
                expected: SCHEMA_VERSION,
            });
        }

        let mut length = [0u8; 8];
        length.copy_from_slice(&bytes[12..HEADER_LEN]);
        let length = usize::try_from(u64::from_le_bytes(length))
            .map_err(|_| BundleError::Corrupt("payload length overflows".to_string()))?;
        let payload = &bytes[HEADER_LEN..];
        if payload.len() < length {
            return Err(BundleError::Truncated {
                expected: HEADER_LEN + length,
                found: bytes.len(),
            });
        }
        if payload.len() > length {
            return Err(BundleError::Corrupt(format!(
                "{} trailing bytes after payload",
                payload.len() - length
            )));
        }

        let raw: RawBundle =
            bincode::deserialize(payload).map_err(|e| BundleError::Corrupt(e.to_string()))?;
        let preprocessor = FittedColumnTransformer::from_params(
            raw.preprocessor.ok_or(BundleError::MissingField("preprocessor"))?,
        )
        .map_err(|e| BundleError::Corrupt(format!("preprocessor: {e}")))?;
        let model = BundleModel::from_params(raw.model.ok_or(BundleError::MissingField("model"))?)
            .map_err(|e| BundleError::Corrupt(format!("model: {e}")))?;
        let label_binarizer = FittedMultiLabelBinarizer::from_params(
            raw.label_binarizer
                .ok_or(BundleError::MissingField("label_binarizer"))?,
        )
        .map_err(|e| BundleError::Corrupt(format!("label binarizer: {e}")))?;
        let feature_order = raw
            .feature_order
            .ok_or(BundleError::MissingField("feature_order"))?;
        let top_k = raw.top_k.ok_or(BundleError::MissingField("top_k"))?;

        let bundle = Self {
            schema_version: version,
            preprocessor,
            model,
            label_binarizer,
            feature_order,
            top_k,
        };
        bundle.check_consistency()?;
        Ok(bundle)
    }

    /// Writes the bundle next to `path` and renames it into place.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), BundleError> {
        let path = path.as_ref();
        let bytes = self.to_bytes()?;
        let mut staging = path.as_os_str().to_owned();
        staging.push(".partial");
        let staging = PathBuf::from(staging);
        std::fs::write(&staging, &bytes)?;
        std::fs::rename(&staging, path)?;
        info!(
            path = %path.display(),
            bytes = bytes.len(),
            labels = self.label_binarizer.n_classes(),
            "saved model bundle"
        );
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, BundleError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => BundleError::NotFound(path.to_path_buf()),
            _ => BundleError::Io(e),
        })?;
        let bundle = Self::from_bytes(&bytes)?;
        info!(
            path = %path.display(),
            schema_version = bundle.schema_version,
            labels = bundle.label_binarizer.n_classes(),
            features = bundle.preprocessor.n_features_out(),
            "loaded model bundle"
        );
        Ok(bundle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{read_dataset, synthetic::synthetic_member_csv, LoadOptions};
    use crate::model::{GradientBoostingClassifier, LogisticRegression, MultiOutputClassifier, StackingClassifier};
    use crate::evaluation::StratifiedKFold;
    use crate::preprocessing::{feature_pipeline, MultiLabelBinarizer, Transformer};
    use std::sync::OnceLock;

    fn small_stack() -> StackingClassifier {
        StackingClassifier::new(
            vec![
                ("xgb".to_string(), GradientBoostingClassifier::xgboost_style().with_n_estimators(8)),
                ("lgb".to_string(), GradientBoostingClassifier::lightgbm_style().with_n_estimators(8)),
            ],
            LogisticRegression::default(),
            StratifiedKFold::new(3).with_shuffle(42),
        )
    }

    fn trained() -> &'static ModelBundle {
        static BUNDLE: OnceLock<ModelBundle> = OnceLock::new();
        BUNDLE.get_or_init(|| {
            let data = read_dataset(synthetic_member_csv(30, 42).as_bytes(), LoadOptions::training())
                .unwrap();
            let preprocessor = feature_pipeline().fit(&data.features).unwrap();
            let binarizer = MultiLabelBinarizer::new().fit(&data.labels).unwrap();
            let x = preprocessor.transform(&data.features).unwrap();
            let y = binarizer.transform(&data.labels).unwrap();
            let model = MultiOutputClassifier::new(small_stack()).fit(x.view(), y.view()).unwrap();
            ModelBundle::new(preprocessor, model, binarizer).unwrap()
        })
    }

    #[test]
    fn test_round_trip_predicts_identically() {
        let bundle = trained();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.bundle");
        bundle.save(&path).unwrap();
        let loaded = ModelBundle::load(&path).unwrap();

        assert_eq!(loaded.feature_order(), bundle.feature_order());
        assert_eq!(loaded.top_k(), 3);
        assert_eq!(loaded.label_binarizer().classes(), bundle.label_binarizer().classes());

        let data = read_dataset(synthetic_member_csv(12, 9).as_bytes(), LoadOptions::training())
            .unwrap();
        let x = bundle.preprocessor().transform(&data.features).unwrap();
        let x_loaded = loaded.preprocessor().transform(&data.features).unwrap();
        assert_eq!(x, x_loaded);
        assert_eq!(
            bundle.model().predict_proba(x.view()).unwrap(),
            loaded.model().predict_proba(x_loaded.view()).unwrap()
        );
    }

    #[test]
    fn test_feature_order_follows_pipeline() {
        let order = trained().feature_order();
        assert_eq!(order.len(), 12);
        assert_eq!(order[0], "Sexe");
        assert_eq!(order[4], "Soft_Skills");
        assert_eq!(order[11], "Indice_Engagement");
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ModelBundle::load(dir.path().join("absent.bundle")),
            Err(BundleError::NotFound(_))
        ));
    }

    #[test]
    fn test_header_errors() {
        let bytes = trained().to_bytes().unwrap();

        assert!(matches!(
            ModelBundle::from_bytes(b"FRM"),
            Err(BundleError::Truncated { .. })
        ));

        let mut bad_magic = bytes.clone();
        bad_magic[0] = b'X';
        assert!(matches!(ModelBundle::from_bytes(&bad_magic), Err(BundleError::BadMagic)));

        let mut future = bytes.clone();
        future[8..12].copy_from_slice(&2u32.to_le_bytes());
        assert!(matches!(
            ModelBundle::from_bytes(&future),
            Err(BundleError::IncompatibleVersion { found: 2, expected: 1 })
        ));

        assert!(matches!(
            ModelBundle::from_bytes(&bytes[..bytes.len() - 5]),
            Err(BundleError::Truncated { .. })
        ));
    }

    fn encode(raw: &RawBundle) -> Vec<u8> {
        let payload = bincode::serialize(raw).unwrap();
        let mut bytes = BUNDLE_MAGIC.to_vec();
        bytes.extend_from_slice(&SCHEMA_VERSION.to_le_bytes());
        bytes.extend_from_slice(&(payload.len() as u64).to_le_bytes());
        bytes.extend_from_slice(&payload);
        bytes
    }

    fn raw_parts(bundle: &ModelBundle) -> RawBundle {
        RawBundle {
            preprocessor: Some(bundle.preprocessor().extract_params()),
            model: Some(bundle.model().extract_params()),
            label_binarizer: Some(bundle.label_binarizer().extract_params()),
            feature_order: Some(bundle.feature_order().to_vec()),
            top_k: Some(bundle.top_k()),
        }
    }

    #[test]
    fn test_missing_field_is_named() {
        let mut raw = raw_parts(trained());
        raw.label_binarizer = None;
        assert!(matches!(
            ModelBundle::from_bytes(&encode(&raw)),
            Err(BundleError::MissingField("label_binarizer"))
        ));
    }

    #[test]
    fn test_inconsistent_parts_are_rejected() {
        let mut raw = raw_parts(trained());
        if let Some(order) = raw.feature_order.as_mut() {
            order.swap(0, 1);
        }
        assert!(matches!(
            ModelBundle::from_bytes(&encode(&raw)),
            Err(BundleError::Inconsistent(_))
        ));

        let mut raw = raw_parts(trained());
        if let Some(binarizer) = raw.label_binarizer.as_mut() {
            binarizer.classes_.push("Zumba".to_string());
        }
        assert!(matches!(
            ModelBundle::from_bytes(&encode(&raw)),
            Err(BundleError::Inconsistent(_))
        ));
    }

    #[test]
    fn test_top_k_is_stored_and_validated() {
        let bundle = trained().clone().with_top_k(1).unwrap();
        let loaded = ModelBundle::from_bytes(&bundle.to_bytes().unwrap()).unwrap();
        assert_eq!(loaded.top_k(), 1);

        assert!(matches!(
            trained().clone().with_top_k(0),
            Err(BundleError::Inconsistent(_))
        ));

        let mut raw = raw_parts(trained());
        raw.top_k = Some(0);
        assert!(matches!(
            ModelBundle::from_bytes(&encode(&raw)),
            Err(BundleError::Inconsistent(_))
        ));

        let mut raw = raw_parts(trained());
        raw.top_k = None;
        assert!(matches!(
            ModelBundle::from_bytes(&encode(&raw)),
            Err(BundleError::MissingField("top_k"))
        ));
    }

    #[test]
    fn test_garbage_payload_is_corrupt() {
        let mut bytes = BUNDLE_MAGIC.to_vec();
        bytes.extend_from_slice(&SCHEMA_VERSION.to_le_bytes());
        bytes.extend_from_slice(&3u64.to_le_bytes());
        bytes.extend_from_slice(&[7, 7, 7]);
        assert!(matches!(ModelBundle::from_bytes(&bytes), Err(BundleError::Corrupt(_))));
    }
}
