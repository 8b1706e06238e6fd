//! End-to-end checks across loader, pipeline, ensemble, bundle and inference.

use formation_recommender::dataset::synthetic::synthetic_member_csv;
use formation_recommender::dataset::{read_dataset, LoadOptions, LoadedDataset};
use formation_recommender::predict::{PredictionError, ValidationError};
use formation_recommender::preprocessing::{FittedTransformer, MultiLabelBinarizer, Transformer};
use formation_recommender::trainer::workflow::fit_bundle;
use formation_recommender::trainer::TrainingConfig;
use formation_recommender::{ModelBundle, Recommender};
use serde_json::{json, Value};
use std::sync::OnceLock;

fn load(text: &str) -> LoadedDataset {
    read_dataset(text.as_bytes(), LoadOptions::training()).unwrap()
}

fn small_config() -> TrainingConfig {
    let mut config = TrainingConfig {
        folds: 3,
        ..Default::default()
    };
    config.xgb.n_estimators = 15;
    config.lgb.n_estimators = 15;
    config
}

fn trained() -> &'static Recommender {
    static RECOMMENDER: OnceLock<Recommender> = OnceLock::new();
    RECOMMENDER.get_or_init(|| {
        let data = load(&synthetic_member_csv(42, 5));
        let (bundle, _) = fit_bundle(&data, &small_config()).unwrap();
        Recommender::new(bundle)
    })
}

fn request() -> Value {
    json!({
        "Age": 20,
        "Sexe": "M",
        "Moyenne_Lycee": 15.2,
        "Filiere": "RT",
        "Autres_Clubs": 2,
        "Projets_Realises": 4,
        "Evaluation_Bureau": 8,
        "Soft_Skills": "Excellent",
        "Score_Entretien": 7,
        "Experience_Professionnelle": "Oui",
        "Indice_Engagement": 0.8,
        "Cellule": "Media"
    })
}

#[test]
fn test_cross_validation_is_reproducible() {
    let data = load(&synthetic_member_csv(20, 11));
    assert_eq!(data.report.kept_rows, 20);
    let y = MultiLabelBinarizer::new().fit_transform(&data.labels).unwrap();
    assert_eq!(y.ncols(), 2);

    let config = TrainingConfig::default();
    let (_, first) = fit_bundle(&data, &config).unwrap();
    let (_, second) = fit_bundle(&data, &config).unwrap();
    assert_eq!(first, second);

    assert_eq!(first.labels.len(), 2);
    for label in &first.labels {
        assert_eq!(label.cv_scores.len(), 5);
        assert!(label.cv_scores.iter().all(|s| (0.0..=1.0).contains(s)));
    }
}

#[test]
fn test_configured_top_k_is_the_default() {
    let data = load(&synthetic_member_csv(24, 6));
    let config = TrainingConfig {
        top_k: 1,
        ..small_config()
    };
    let (bundle, _) = fit_bundle(&data, &config).unwrap();
    assert_eq!(bundle.top_k(), 1);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("single.bundle");
    bundle.save(&path).unwrap();
    let recommender = Recommender::load(&path).unwrap();
    assert_eq!(recommender.default_top_k(), 1);

    let top = recommender
        .recommend_json(&request(), recommender.default_top_k())
        .unwrap();
    assert_eq!(top.len(), 1);
}

#[test]
fn test_unknown_filiere_and_blank_targets_are_dropped() {
    let base = synthetic_member_csv(20, 3);
    let first_row = base.lines().nth(1).unwrap();

    let unknown = first_row.replacen(",IIA,", ",ARCHI,", 1);
    let (head, _) = first_row.rsplit_once(',').unwrap();
    let blank = format!("{},\"   \"", head);
    let text = format!("{}\n{}\n{}", base, unknown, blank);

    let clean = load(&base);
    let dirty = load(&text);
    assert_eq!(dirty.report.total_rows, 22);
    assert_eq!(dirty.report.dropped_unknown_filiere, 1);
    assert_eq!(dirty.report.dropped_unlabeled, 1);
    assert_eq!(dirty.report.kept_rows, clean.report.kept_rows);
    assert_eq!(dirty.features.n_rows(), clean.features.n_rows());
}

#[test]
fn test_bundle_round_trip_recommends_identically() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("formations.bundle");
    trained().bundle().save(&path).unwrap();
    let reloaded = Recommender::new(ModelBundle::load(&path).unwrap());

    let before = trained().recommend_json(&request(), 3).unwrap();
    let after = reloaded.recommend_json(&request(), 3).unwrap();
    assert_eq!(before, after);
}

#[test]
fn test_recommendations_are_bounded_and_sorted() {
    let recommendations = trained().recommend_json(&request(), 3).unwrap();
    assert!(!recommendations.is_empty());
    assert!(recommendations.len() <= 3);
    assert!(recommendations
        .iter()
        .all(|r| (0.0..=1.0).contains(&r.confidence)));
    assert!(recommendations
        .windows(2)
        .all(|w| w[0].confidence >= w[1].confidence));
}

#[test]
fn test_unseen_cell_encodes_to_zero_group() {
    let mut unseen = request();
    unseen["Cellule"] = json!("Robotique");
    let object = unseen.as_object().unwrap();
    let frame =
        formation_recommender::predict::request_frame(object, trained().bundle().feature_order()).unwrap();

    let preprocessor = trained().bundle().preprocessor();
    let x = preprocessor.transform(&frame).unwrap();
    let names = preprocessor.feature_names_out();
    let cell_columns: Vec<usize> = names
        .iter()
        .enumerate()
        .filter(|(_, n)| n.starts_with("cat__Cellule_"))
        .map(|(i, _)| i)
        .collect();
    assert!(!cell_columns.is_empty());
    assert!(cell_columns.iter().all(|&j| x[[0, j]] == 0.0));

    // the record is still scored
    assert!(trained().recommend_json(&unseen, 3).is_ok());
}

#[test]
fn test_missing_key_is_a_validation_error() {
    let mut incomplete = request();
    incomplete.as_object_mut().unwrap().remove("Score_Entretien");
    let err = trained().recommend_json(&incomplete, 3).unwrap_err();
    assert!(matches!(
        err,
        PredictionError::Validation(ValidationError::MissingField(ref f)) if f == "Score_Entretien"
    ));
}

#[test]
fn test_batch_predictions_cover_every_member() {
    let data = read_dataset(synthetic_member_csv(12, 9).as_bytes(), LoadOptions::inference()).unwrap();
    let predictions = trained().batch_predict(&data).unwrap();
    assert_eq!(predictions.len(), 12);
    assert_eq!(predictions[0].member_id, "M001");
}
