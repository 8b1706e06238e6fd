//! End-to-end training: load, encode, split, cross-validate, fit, evaluate, store.

use crate::bundle::{BundleError, ModelBundle};
use crate::dataset::{load_dataset, DatasetError, LoadOptions, LoadReport, LoadedDataset};
use crate::evaluation::{
    cross_val_score_per_label, train_test_split, EvaluationError, EvaluationReport, SplitError,
};
use crate::model::{ModelError, MultiOutputClassifier};
use crate::preprocessing::{
    feature_pipeline, FittedTransformer, MultiLabelBinarizer, PreprocessingError, Transformer,
};
use crate::trainer::config::{ConfigError, TrainingConfig};
use ndarray::Axis;
use std::path::PathBuf;
use std::time::Instant;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum TrainingError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    #[error(transparent)]
    Preprocessing(#[from] PreprocessingError),
    #[error(transparent)]
    Split(#[from] SplitError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
    #[error(transparent)]
    Bundle(#[from] BundleError),
}

/// Result of a completed training run.
#[derive(Debug)]
pub struct TrainingOutcome {
    pub bundle: ModelBundle,
    pub bundle_path: PathBuf,
    pub report: EvaluationReport,
    pub load_report: LoadReport,
}

/// Fits the feature pipeline, label binarizer and model on a loaded table.
///
/// The pipeline and binarizer see every row. Rows are then split into train
/// and holdout sets, stratified on the first label column only; labels are
/// cross-validated on the train rows, the model is fit on them and scored on
/// the holdout rows.
pub fn fit_bundle(
    data: &LoadedDataset,
    config: &TrainingConfig,
) -> Result<(ModelBundle, EvaluationReport), TrainingError> {
    config.validate()?;
    let started = Instant::now();

    let binarizer = MultiLabelBinarizer::new().fit(&data.labels)?;
    let y = binarizer.transform(&data.labels)?;
    let preprocessor = feature_pipeline().fit(&data.features)?;
    let x = preprocessor.transform(&data.features)?;
    info!(
        rows = x.nrows(),
        features = x.ncols(),
        labels = binarizer.n_classes(),
        "encoded training table"
    );
    if binarizer.n_classes() > 1 {
        warn!(
            stratify_on = %binarizer.classes()[0],
            "holdout split is stratified on the first label only"
        );
    }

    let first_label = y.column(0).to_vec();
    let (train, eval) = train_test_split(x.nrows(), config.test_size, config.seed, Some(&first_label))?;
    let (x_train, y_train) = (x.select(Axis(0), &train), y.select(Axis(0), &train));
    let (x_eval, y_eval) = (x.select(Axis(0), &eval), y.select(Axis(0), &eval));

    let stack = config.stacking();
    let cv_scores = cross_val_score_per_label(&stack, x_train.view(), y_train.view(), &config.cv())?;

    let model = MultiOutputClassifier::new(stack).fit(x_train.view(), y_train.view())?;
    let y_pred = model.predict(x_eval.view())?;
    let report = EvaluationReport::new(binarizer.classes(), cv_scores, y_eval.view(), y_pred.view())?;

    let bundle = ModelBundle::new(preprocessor, model, binarizer)?.with_top_k(config.top_k)?;
    info!(
        train_rows = train.len(),
        holdout_rows = eval.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "training finished"
    );
    Ok((bundle, report))
}

/// Runs a full training job as configured and writes the bundle.
pub fn run_training(config: &TrainingConfig) -> Result<TrainingOutcome, TrainingError> {
    config.validate()?;
    let data = load_dataset(&config.data_path, config.encoding, LoadOptions::training())?;
    let (bundle, report) = fit_bundle(&data, config)?;
    bundle.save(&config.bundle_path)?;
    Ok(TrainingOutcome {
        bundle,
        bundle_path: config.bundle_path.clone(),
        report,
        load_report: data.report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::synthetic::synthetic_member_csv;
    use crate::dataset::TextEncoding;
    use crate::predict::Recommender;

    fn quick_config() -> TrainingConfig {
        let mut config = TrainingConfig {
            folds: 3,
            ..Default::default()
        };
        config.xgb.n_estimators = 10;
        config.lgb.n_estimators = 10;
        config
    }

    #[test]
    fn test_run_training_writes_loadable_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let data_path = dir.path().join("train.csv");
        std::fs::write(&data_path, synthetic_member_csv(40, 3)).unwrap();

        let config = TrainingConfig {
            data_path,
            encoding: TextEncoding::Utf8,
            bundle_path: dir.path().join("model.bundle"),
            ..quick_config()
        };
        let outcome = run_training(&config).unwrap();

        assert_eq!(outcome.load_report.kept_rows, 40);
        assert_eq!(outcome.report.labels.len(), 2);
        assert!(outcome.report.labels.iter().all(|l| l.cv_scores.len() == 3));

        let recommender = Recommender::load(&outcome.bundle_path).unwrap();
        assert_eq!(recommender.labels(), ["Leadership", "Python"]);
    }

    #[test]
    fn test_fit_bundle_rejects_invalid_config() {
        let data = crate::dataset::read_dataset(
            synthetic_member_csv(20, 1).as_bytes(),
            LoadOptions::training(),
        )
        .unwrap();
        let config = TrainingConfig {
            folds: 1,
            ..Default::default()
        };
        assert!(matches!(
            fit_bundle(&data, &config),
            Err(TrainingError::Config(ConfigError::Invalid(_)))
        ));
    }

    #[test]
    fn test_missing_data_file() {
        let config = TrainingConfig {
            data_path: PathBuf::from("/nonexistent/train.csv"),
            ..Default::default()
        };
        assert!(matches!(
            run_training(&config),
            Err(TrainingError::Dataset(DatasetError::NotFound(_)))
        ));
    }
}
