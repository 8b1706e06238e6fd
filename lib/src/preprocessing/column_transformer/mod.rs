//! ColumnTransformer for applying different transformers to different columns.
//!
//! This module provides the `ColumnTransformer` which applies a preprocessing
//! step to each named group of columns, plus [`feature_pipeline`], the
//! canonical pipeline for the member table.

#[allow(clippy::module_inception)]
mod column_transformer;

pub use column_transformer::{
    feature_pipeline, ColumnTransformer, ColumnTransformerParams, ColumnTransformerStep,
    FittedColumnTransformer, FittedColumnTransformerStep, NamedStepParams, StepParams,
};
