//! Inference over a loaded bundle.
//!
//! [`Recommender`] is the read-only context a server or batch job builds once
//! from a [`ModelBundle`]; every call takes `&self`, so one instance can be
//! shared across threads. Requests arrive as flat JSON objects keyed by
//! column name and are validated before they reach the pipeline.

use crate::bundle::{BundleError, ModelBundle};
use crate::dataset::{
    clean_column_name, is_known_filiere, Cell, FeatureFrame, LoadedDataset, FILIERE_COLUMN,
    OPTIONAL_FEATURE_COLUMNS,
};
use crate::model::ModelError;
use crate::preprocessing::{FittedTransformer, PreprocessingError};
use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// Number of workshops returned per request unless configured otherwise.
pub const DEFAULT_TOP_K: usize = 3;

/// Problems with the caller's input.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("missing required field '{0}'")]
    MissingField(String),
    /// Two request keys normalize to the same column name.
    #[error("duplicate field after normalization: {0}")]
    DuplicateField(String),
    #[error("field '{field}' {reason}")]
    InvalidValue { field: String, reason: String },
    #[error("unknown Filiere '{0}'")]
    UnknownFiliere(String),
    #[error("request must be a JSON object")]
    NotAnObject,
    #[error("expected exactly one record, got {0}")]
    RowCount(usize),
    #[error(transparent)]
    Preprocessing(PreprocessingError),
}

#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),
    #[error("model failure: {0}")]
    Model(String),
}

impl From<ModelError> for PredictionError {
    fn from(err: ModelError) -> Self {
        PredictionError::Model(err.to_string())
    }
}

impl From<PreprocessingError> for PredictionError {
    fn from(err: PreprocessingError) -> Self {
        if err.is_input_error() {
            PredictionError::Validation(ValidationError::Preprocessing(err))
        } else {
            PredictionError::Model(err.to_string())
        }
    }
}

/// One recommended workshop.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub workshop: String,
    /// Positive-class probability in [0, 1].
    pub confidence: f64,
}

/// Hard multi-label decision for one member of a batch.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BatchPrediction {
    pub member_id: String,
    pub formations: Vec<String>,
}

/// Converts a JSON object into a one-row frame laid out in `feature_order`.
///
/// Keys go through [`clean_column_name`], so accented spellings are accepted,
/// but two keys naming the same column are rejected. Keys outside
/// `feature_order` are ignored; optional columns that are absent become
/// missing cells.
pub fn request_frame<S: AsRef<str>>(
    request: &Map<String, Value>,
    feature_order: &[S],
) -> Result<FeatureFrame, ValidationError> {
    let mut cells: HashMap<String, Cell> = HashMap::new();
    for (key, value) in request {
        let name = clean_column_name(key);
        if !feature_order.iter().any(|c| c.as_ref() == name) {
            continue;
        }
        let cell = match value {
            Value::Null => Cell::Missing,
            Value::Number(n) => n.as_f64().map(Cell::Number).ok_or_else(|| ValidationError::InvalidValue {
                field: name.clone(),
                reason: "is not a finite number".to_string(),
            })?,
            Value::String(s) => Cell::parse(s),
            Value::Bool(_) | Value::Array(_) | Value::Object(_) => {
                return Err(ValidationError::InvalidValue {
                    field: name,
                    reason: "must be a number or a string".to_string(),
                })
            }
        };
        if cells.contains_key(&name) {
            return Err(ValidationError::DuplicateField(name));
        }
        cells.insert(name, cell);
    }

    for column in feature_order {
        let column = column.as_ref();
        if OPTIONAL_FEATURE_COLUMNS.iter().any(|optional| *optional == column) {
            continue;
        }
        match cells.get(column) {
            None | Some(Cell::Missing) => return Err(ValidationError::MissingField(column.to_string())),
            Some(_) => {}
        }
    }
    if let Some(filiere) = cells.get(FILIERE_COLUMN).and_then(Cell::category) {
        if !is_known_filiere(&filiere) {
            return Err(ValidationError::UnknownFiliere(filiere));
        }
    }

    FeatureFrame::single_row(feature_order.iter().map(|name| {
        let name = name.as_ref();
        (name, cells.remove(name).unwrap_or(Cell::Missing))
    }))
    .map_err(ValidationError::Preprocessing)
}

/// Top `k` labels of one probability row, highest first; ties keep label order.
pub fn top_k(classes: &[String], proba: ArrayView1<f64>, k: usize) -> Vec<Recommendation> {
    let mut ranked: Vec<(usize, f64)> = proba.iter().copied().enumerate().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked
        .into_iter()
        .take(k)
        .map(|(i, p)| Recommendation {
            workshop: classes[i].clone(),
            confidence: p.clamp(0.0, 1.0),
        })
        .collect()
}

/// Immutable inference context around a bundle.
#[derive(Clone, Debug)]
pub struct Recommender {
    bundle: ModelBundle,
}

impl Recommender {
    pub fn new(bundle: ModelBundle) -> Self {
        Self { bundle }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, BundleError> {
        Ok(Self::new(ModelBundle::load(path)?))
    }

    pub fn bundle(&self) -> &ModelBundle {
        &self.bundle
    }

    /// Workshop vocabulary in model output order.
    pub fn labels(&self) -> &[String] {
        self.bundle.label_binarizer().classes()
    }

    /// How many workshops to return when the caller has no preference.
    pub fn default_top_k(&self) -> usize {
        self.bundle.top_k()
    }

    /// Per-label probabilities, shape `(rows, labels)`.
    pub fn predict_proba(&self, frame: &FeatureFrame) -> Result<Array2<f64>, PredictionError> {
        let x = self.bundle.preprocessor().transform(frame)?;
        Ok(self.bundle.model().predict_proba(x.view())?)
    }

    /// Up to `k` workshops for a one-row frame, by descending confidence.
    pub fn recommend(&self, frame: &FeatureFrame, k: usize) -> Result<Vec<Recommendation>, PredictionError> {
        if frame.n_rows() != 1 {
            return Err(ValidationError::RowCount(frame.n_rows()).into());
        }
        let proba = self.predict_proba(frame)?;
        let recommendations = top_k(self.labels(), proba.row(0), k);
        debug!(k, returned = recommendations.len(), "recommended workshops");
        Ok(recommendations)
    }

    /// Validates a JSON request and recommends for it.
    pub fn recommend_json(&self, request: &Value, k: usize) -> Result<Vec<Recommendation>, PredictionError> {
        let object = request.as_object().ok_or(ValidationError::NotAnObject)?;
        let frame = request_frame(object, self.bundle.feature_order())?;
        self.recommend(&frame, k)
    }

    /// Hard 0.5-threshold label sets for every member of a loaded table.
    pub fn batch_predict(&self, data: &LoadedDataset) -> Result<Vec<BatchPrediction>, PredictionError> {
        let x = self.bundle.preprocessor().transform(&data.features)?;
        let y = self.bundle.model().predict(x.view())?;
        let label_sets = self.bundle.label_binarizer().inverse_transform_matrix(y.view())?;
        let predictions: Vec<BatchPrediction> = data
            .member_ids
            .iter()
            .zip(label_sets)
            .map(|(id, formations)| BatchPrediction {
                member_id: id.clone(),
                formations,
            })
            .collect();
        info!(rows = predictions.len(), "scored batch");
        Ok(predictions)
    }
}

#[derive(Serialize)]
struct PredictionRow<'a> {
    #[serde(rename = "ID_MEMBER")]
    member_id: &'a str,
    #[serde(rename = "Formations")]
    formations: String,
}

/// Writes `ID_MEMBER,Formations` rows, labels joined with `"; "`.
pub fn write_predictions<W: std::io::Write>(
    writer: W,
    predictions: &[BatchPrediction],
) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    for prediction in predictions {
        wtr.serialize(PredictionRow {
            member_id: &prediction.member_id,
            formations: prediction.formations.join("; "),
        })?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::feature_columns;
    use ndarray::arr1;
    use serde_json::json;

    fn frame_for(request: &Value) -> Result<FeatureFrame, ValidationError> {
        let order: Vec<&str> = feature_columns().collect();
        request_frame(request.as_object().unwrap(), &order[..])
    }

    fn request() -> Value {
        json!({
            "Age": 21,
            "Sexe": "F",
            "Moyenne_Lycee": 14.5,
            "Filiere": "GL",
            "Autres_Clubs": 1,
            "Projets_Realises": 3,
            "Evaluation_Bureau": 7,
            "Soft_Skills": "Bon",
            "Score_Entretien": 8,
            "Experience_Professionnelle": "Non",
            "Indice_Engagement": 0.6,
            "Cellule": "Media"
        })
    }

    #[test]
    fn test_request_frame_has_every_feature_column() {
        let frame = frame_for(&request()).unwrap();
        assert_eq!(frame.n_rows(), 1);
        assert_eq!(frame.n_columns(), 12);
        assert_eq!(frame.column("Filiere").unwrap()[0], Cell::Text("GL".to_string()));
        assert_eq!(frame.column("Age").unwrap()[0], Cell::Number(21.0));
    }

    #[test]
    fn test_request_frame_accepts_accented_keys_and_extras() {
        let mut value = request();
        let object = value.as_object_mut().unwrap();
        let filiere = object.remove("Filiere").unwrap();
        object.insert("Filière".to_string(), filiere);
        let average = object.remove("Moyenne_Lycee").unwrap();
        object.insert("Moyenne Lycée".to_string(), average);
        object.insert("Nickname".to_string(), json!("Zed"));

        let frame = frame_for(&value).unwrap();
        assert_eq!(frame.column("Moyenne_Lycee").unwrap()[0], Cell::Number(14.5));
        assert!(frame.column("Nickname").is_none());
    }

    #[test]
    fn test_request_frame_cellule_is_optional() {
        let mut value = request();
        value.as_object_mut().unwrap().remove("Cellule");
        let frame = frame_for(&value).unwrap();
        assert!(frame.column("Cellule").unwrap()[0].is_missing());
    }

    #[test]
    fn test_request_frame_missing_key() {
        let mut value = request();
        value.as_object_mut().unwrap().remove("Score_Entretien");
        let err = frame_for(&value).unwrap_err();
        assert!(matches!(err, ValidationError::MissingField(ref f) if f == "Score_Entretien"));

        let mut value = request();
        value["Age"] = Value::Null;
        assert!(matches!(
            frame_for(&value),
            Err(ValidationError::MissingField(_))
        ));
    }

    #[test]
    fn test_request_frame_rejects_bad_values() {
        let mut value = request();
        value["Filiere"] = json!("ARCHI");
        assert!(matches!(
            frame_for(&value),
            Err(ValidationError::UnknownFiliere(ref f)) if f == "ARCHI"
        ));

        let mut value = request();
        value["Age"] = json!([21]);
        assert!(matches!(
            frame_for(&value),
            Err(ValidationError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_request_frame_rejects_colliding_keys() {
        let mut value = request();
        value["Filiere"] = json!("ARCHI");
        value["Filière"] = json!("GL");
        assert!(matches!(
            frame_for(&value),
            Err(ValidationError::DuplicateField(ref f)) if f == "Filiere"
        ));

        let mut value = request();
        value["Moyenne Lycée"] = json!(12.0);
        let err = frame_for(&value).unwrap_err();
        assert_eq!(err.to_string(), "duplicate field after normalization: Moyenne_Lycee");
    }

    #[test]
    fn test_request_frame_follows_given_order() {
        let order = ["Score_Entretien", "Age", "Filiere"];
        let frame = request_frame(request().as_object().unwrap(), &order).unwrap();
        assert_eq!(frame.names(), &["Score_Entretien", "Age", "Filiere"]);
        assert_eq!(frame.column("Age").unwrap()[0], Cell::Number(21.0));
        assert!(frame.column("Sexe").is_none());

        let mut value = request();
        value.as_object_mut().unwrap().remove("Sexe");
        assert!(request_frame(value.as_object().unwrap(), &order).is_ok());
        value.as_object_mut().unwrap().remove("Age");
        assert!(matches!(
            request_frame(value.as_object().unwrap(), &order),
            Err(ValidationError::MissingField(ref f)) if f == "Age"
        ));
    }

    #[test]
    fn test_top_k_orders_and_truncates() {
        let classes: Vec<String> = ["A", "B", "C", "D"].iter().map(|s| s.to_string()).collect();
        let proba = arr1(&[0.2, 0.9, 0.2, 0.5]);
        let top = top_k(&classes, proba.view(), 3);
        let names: Vec<&str> = top.iter().map(|r| r.workshop.as_str()).collect();
        assert_eq!(names, vec!["B", "D", "A"]);
        assert_eq!(top_k(&classes, proba.view(), 10).len(), 4);
        assert!(top_k(&classes, proba.view(), 0).is_empty());
    }

    #[test]
    fn test_preprocessing_errors_are_classified() {
        let input: PredictionError = PreprocessingError::UnknownCategory {
            column: "Soft_Skills".to_string(),
            value: "Legendary".to_string(),
        }
        .into();
        assert!(matches!(input, PredictionError::Validation(_)));

        let internal: PredictionError = PreprocessingError::InvalidShape {
            expected: "a".to_string(),
            got: "b".to_string(),
        }
        .into();
        assert!(matches!(internal, PredictionError::Model(_)));
    }

    #[test]
    fn test_write_predictions_csv() {
        let predictions = vec![
            BatchPrediction {
                member_id: "M001".to_string(),
                formations: vec!["Leadership".to_string(), "Python".to_string()],
            },
            BatchPrediction {
                member_id: "M002".to_string(),
                formations: vec![],
            },
        ];
        let mut out = Vec::new();
        write_predictions(&mut out, &predictions).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "ID_MEMBER,Formations\nM001,Leadership; Python\nM002,\n"
        );
    }
}
