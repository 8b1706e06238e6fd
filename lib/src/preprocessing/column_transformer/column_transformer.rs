//! ColumnTransformer implementation.
//!
//! Applies different transformers to different named column groups and
//! concatenates results. Columns not claimed by any step are dropped.

use crate::dataset::{FeatureFrame, NOMINAL_COLUMNS, NUMERIC_COLUMNS, ORDINAL_COLUMNS};
use crate::preprocessing::encoding::{
    DropPolicy, FittedOneHotEncoder, FittedOrdinalEncoder, HandleUnknown, OneHotEncoder,
    OneHotEncoderParams, OrdinalEncoder, OrdinalEncoderParams,
};
use crate::preprocessing::error::PreprocessingError;
use crate::preprocessing::scaling::{FittedMinMaxScaler, MinMaxScaler, MinMaxScalerParams};
use crate::preprocessing::traits::{FittedTransformer, Transformer};
use ndarray::{concatenate, Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Enum of unfitted transformers that can be used in a ColumnTransformer.
#[derive(Clone, Debug)]
pub enum ColumnTransformerStep {
    OneHotEncoder(OneHotEncoder),
    OrdinalEncoder(OrdinalEncoder),
    MinMaxScaler(MinMaxScaler),
}

/// Enum of fitted transformers for ColumnTransformer.
#[derive(Clone, Debug)]
pub enum FittedColumnTransformerStep {
    OneHotEncoder(FittedOneHotEncoder),
    OrdinalEncoder(FittedOrdinalEncoder),
    MinMaxScaler(FittedMinMaxScaler),
}

impl FittedColumnTransformerStep {
    /// Transform the data.
    fn transform(&self, data: &FeatureFrame) -> Result<Array2<f64>, PreprocessingError> {
        match self {
            FittedColumnTransformerStep::OneHotEncoder(t) => t.transform(data),
            FittedColumnTransformerStep::OrdinalEncoder(t) => t.transform(data),
            FittedColumnTransformerStep::MinMaxScaler(t) => t.transform(data),
        }
    }

    /// Get the step type name.
    fn step_type(&self) -> &'static str {
        match self {
            FittedColumnTransformerStep::OneHotEncoder(_) => "OneHotEncoder",
            FittedColumnTransformerStep::OrdinalEncoder(_) => "OrdinalEncoder",
            FittedColumnTransformerStep::MinMaxScaler(_) => "MinMaxScaler",
        }
    }

    /// Get the number of output features.
    fn n_features_out(&self) -> usize {
        match self {
            FittedColumnTransformerStep::OneHotEncoder(t) => t.n_features_out(),
            FittedColumnTransformerStep::OrdinalEncoder(t) => t.n_features_out(),
            FittedColumnTransformerStep::MinMaxScaler(t) => t.n_features_in(),
        }
    }

    /// Output names before the step prefix is applied.
    fn feature_names_out(&self) -> Vec<String> {
        match self {
            FittedColumnTransformerStep::OneHotEncoder(t) => t.feature_names_out(),
            FittedColumnTransformerStep::OrdinalEncoder(t) => t.columns().to_vec(),
            FittedColumnTransformerStep::MinMaxScaler(t) => t.columns().to_vec(),
        }
    }

    fn extract_params(&self) -> StepParams {
        match self {
            FittedColumnTransformerStep::OneHotEncoder(t) => StepParams::OneHotEncoder(t.extract_params()),
            FittedColumnTransformerStep::OrdinalEncoder(t) => StepParams::OrdinalEncoder(t.extract_params()),
            FittedColumnTransformerStep::MinMaxScaler(t) => StepParams::MinMaxScaler(t.extract_params()),
        }
    }

    fn from_params(params: StepParams) -> Result<Self, PreprocessingError> {
        Ok(match params {
            StepParams::OneHotEncoder(p) => {
                FittedColumnTransformerStep::OneHotEncoder(FittedOneHotEncoder::from_params(p)?)
            }
            StepParams::OrdinalEncoder(p) => {
                FittedColumnTransformerStep::OrdinalEncoder(FittedOrdinalEncoder::from_params(p)?)
            }
            StepParams::MinMaxScaler(p) => {
                FittedColumnTransformerStep::MinMaxScaler(FittedMinMaxScaler::from_params(p)?)
            }
        })
    }
}

/// Fit a column transformer step from an unfitted step.
fn fit_step(
    step: &ColumnTransformerStep,
    data: &FeatureFrame,
) -> Result<FittedColumnTransformerStep, PreprocessingError> {
    match step {
        ColumnTransformerStep::OneHotEncoder(t) => {
            t.fit(data).map(FittedColumnTransformerStep::OneHotEncoder)
        }
        ColumnTransformerStep::OrdinalEncoder(t) => {
            t.fit(data).map(FittedColumnTransformerStep::OrdinalEncoder)
        }
        ColumnTransformerStep::MinMaxScaler(t) => {
            t.fit(data).map(FittedColumnTransformerStep::MinMaxScaler)
        }
    }
}

/// A named step bound to the columns it consumes.
#[derive(Clone, Debug)]
struct NamedStep<S> {
    name: String,
    columns: Vec<String>,
    step: S,
}

/// ColumnTransformer applies different transformers to different columns.
///
/// Each step owns a named group of input columns. Output blocks are
/// concatenated in step order, and input columns that no step names are
/// dropped.
///
/// # Example
/// ```ignore
/// use formation_recommender::preprocessing::{
///     ColumnTransformer, MinMaxScaler, OneHotEncoder, Transformer,
/// };
///
/// let ct = ColumnTransformer::new()
///     .add_one_hot_encoder("cat", OneHotEncoder::new(), &["Sexe", "Filiere"])
///     .add_minmax_scaler("num", MinMaxScaler::new(), &["Age"]);
///
/// let fitted = ct.fit(&frame)?;
/// let transformed = fitted.transform(&frame)?;
/// ```
#[derive(Clone, Debug, Default)]
pub struct ColumnTransformer {
    steps: Vec<NamedStep<ColumnTransformerStep>>,
}

impl ColumnTransformer {
    /// Create a new empty ColumnTransformer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a OneHotEncoder for the named columns.
    pub fn add_one_hot_encoder<S: AsRef<str>>(self, name: &str, encoder: OneHotEncoder, columns: &[S]) -> Self {
        self.add(name, ColumnTransformerStep::OneHotEncoder(encoder), columns)
    }

    /// Add an OrdinalEncoder for the named columns.
    pub fn add_ordinal_encoder<S: AsRef<str>>(self, name: &str, encoder: OrdinalEncoder, columns: &[S]) -> Self {
        self.add(name, ColumnTransformerStep::OrdinalEncoder(encoder), columns)
    }

    /// Add a MinMaxScaler for the named columns.
    pub fn add_minmax_scaler<S: AsRef<str>>(self, name: &str, scaler: MinMaxScaler, columns: &[S]) -> Self {
        self.add(name, ColumnTransformerStep::MinMaxScaler(scaler), columns)
    }

    /// Add a generic step.
    pub fn add<S: AsRef<str>>(mut self, name: &str, step: ColumnTransformerStep, columns: &[S]) -> Self {
        self.steps.push(NamedStep {
            name: name.to_string(),
            columns: columns.iter().map(|c| c.as_ref().to_string()).collect(),
            step,
        });
        self
    }

    /// Get the number of transformer steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Serializable parameters of one fitted step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum StepParams {
    OneHotEncoder(OneHotEncoderParams),
    OrdinalEncoder(OrdinalEncoderParams),
    MinMaxScaler(MinMaxScalerParams),
}

/// Serializable parameters for a fitted column transformer step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NamedStepParams {
    /// Step name, used as the output name prefix.
    pub name: String,
    /// Input columns this step was applied to.
    pub columns: Vec<String>,
    pub params: StepParams,
}

/// Serializable parameters for a fitted ColumnTransformer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColumnTransformerParams {
    /// Number of output features.
    pub n_features_out: usize,
    /// Step parameters.
    pub steps: Vec<NamedStepParams>,
}

/// Fitted ColumnTransformer ready for inference.
#[derive(Clone, Debug)]
pub struct FittedColumnTransformer {
    fitted_steps: Vec<NamedStep<FittedColumnTransformerStep>>,
    n_features_out: usize,
}

impl FittedColumnTransformer {
    /// Get the number of output features.
    pub fn n_features_out(&self) -> usize {
        self.n_features_out
    }

    /// Input columns in the order the steps consume them.
    ///
    /// This is the feature order persisted with a model bundle.
    pub fn input_columns(&self) -> Vec<String> {
        self.fitted_steps
            .iter()
            .flat_map(|s| s.columns.iter().cloned())
            .collect()
    }

    /// Output column names, `<step>__<feature>`.
    pub fn feature_names_out(&self) -> Vec<String> {
        self.fitted_steps
            .iter()
            .flat_map(|s| {
                s.step
                    .feature_names_out()
                    .into_iter()
                    .map(move |f| format!("{}__{}", s.name, f))
            })
            .collect()
    }

    /// Get step names with their step type and columns.
    pub fn step_names(&self) -> Vec<(&str, &'static str, &[String])> {
        self.fitted_steps
            .iter()
            .map(|s| (s.name.as_str(), s.step.step_type(), s.columns.as_slice()))
            .collect()
    }
}

impl Transformer for ColumnTransformer {
    type Input = FeatureFrame;
    type Output = Array2<f64>;
    type Params = ColumnTransformerParams;
    type Fitted = FittedColumnTransformer;

    fn fit(&self, data: &Self::Input) -> Result<Self::Fitted, PreprocessingError> {
        if data.is_empty() {
            return Err(PreprocessingError::EmptyData(
                "Cannot fit ColumnTransformer on empty data".to_string(),
            ));
        }

        if self.steps.is_empty() {
            return Err(PreprocessingError::InvalidParameter(
                "Cannot fit empty ColumnTransformer".to_string(),
            ));
        }

        let mut fitted_steps = Vec::with_capacity(self.steps.len());
        let mut n_features_out = 0;

        for NamedStep { name, columns, step } in &self.steps {
            let group = data.select_columns(columns)?;
            let fitted = fit_step(step, &group)?;
            debug!(step = %name, inputs = columns.len(), outputs = fitted.n_features_out(), "fitted column step");

            n_features_out += fitted.n_features_out();
            fitted_steps.push(NamedStep {
                name: name.clone(),
                columns: columns.clone(),
                step: fitted,
            });
        }

        Ok(FittedColumnTransformer {
            fitted_steps,
            n_features_out,
        })
    }
}

impl FittedTransformer for FittedColumnTransformer {
    type Input = FeatureFrame;
    type Output = Array2<f64>;
    type Params = ColumnTransformerParams;

    fn transform(&self, data: &Self::Input) -> Result<Self::Output, PreprocessingError> {
        if data.is_empty() {
            return Ok(Array2::zeros((0, self.n_features_out)));
        }

        // Transform each step and collect outputs
        let mut transformed_outputs = Vec::with_capacity(self.fitted_steps.len());
        for NamedStep { columns, step, .. } in &self.fitted_steps {
            let group = data.select_columns(columns)?;
            transformed_outputs.push(step.transform(&group)?);
        }

        // Concatenate all outputs horizontally
        let views: Vec<_> = transformed_outputs.iter().map(|a| a.view()).collect();
        concatenate(Axis(1), &views).map_err(|e| PreprocessingError::InvalidShape {
            expected: format!("{} rows in every block", data.n_rows()),
            got: e.to_string(),
        })
    }

    fn extract_params(&self) -> Self::Params {
        ColumnTransformerParams {
            n_features_out: self.n_features_out,
            steps: self
                .fitted_steps
                .iter()
                .map(|s| NamedStepParams {
                    name: s.name.clone(),
                    columns: s.columns.clone(),
                    params: s.step.extract_params(),
                })
                .collect(),
        }
    }

    fn from_params(params: Self::Params) -> Result<Self, PreprocessingError> {
        let mut fitted_steps = Vec::with_capacity(params.steps.len());
        for step_params in params.steps {
            fitted_steps.push(NamedStep {
                name: step_params.name,
                columns: step_params.columns,
                step: FittedColumnTransformerStep::from_params(step_params.params)?,
            });
        }

        let n_features_out: usize = fitted_steps.iter().map(|s| s.step.n_features_out()).sum();
        if n_features_out != params.n_features_out {
            return Err(PreprocessingError::FeatureMismatch {
                expected_features: params.n_features_out,
                got_features: n_features_out,
            });
        }

        Ok(FittedColumnTransformer {
            fitted_steps,
            n_features_out,
        })
    }

    fn n_features_in(&self) -> usize {
        self.fitted_steps.iter().map(|s| s.columns.len()).sum()
    }
}

/// The member-table feature pipeline.
///
/// - `cat`: one-hot over the nominal columns, first category dropped,
///   unknown or missing values encoded as an all-zero group.
/// - `ord`: ordinal ranks over the ordinal columns, unknown values rejected.
/// - `num`: min-max scaling of the numeric columns to [0, 1].
pub fn feature_pipeline() -> ColumnTransformer {
    ColumnTransformer::new()
        .add_one_hot_encoder(
            "cat",
            OneHotEncoder::new()
                .with_drop(DropPolicy::First)
                .with_handle_unknown(HandleUnknown::Ignore),
            &NOMINAL_COLUMNS,
        )
        .add_ordinal_encoder(
            "ord",
            OrdinalEncoder::new().with_handle_unknown(HandleUnknown::Error),
            &ORDINAL_COLUMNS,
        )
        .add_minmax_scaler("num", MinMaxScaler::new(), &NUMERIC_COLUMNS)
}
