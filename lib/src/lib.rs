//! # formation-recommender
//!
//! Multi-label workshop recommendations for club members.
//!
//! A training run loads the member table, fits a feature pipeline and a label
//! binarizer, trains one stacked ensemble per workshop (two boosted-tree base
//! learners under a logistic meta-learner), evaluates it, and writes every
//! fitted artifact into a single versioned bundle. Inference loads that bundle
//! once and answers top-k queries from a read-only context.
//!
//! ## Core Design Principles
//!
//! - **Training/Inference Separation**: every estimator has an unfitted
//!   hyperparameter type and a distinct fitted type; fitted types hold only what
//!   prediction needs and serialize to plain parameter structs.
//! - **Stateful Type Safety**: gradient-trained models carry their state in the
//!   type (`Unfitted` vs `Fitted`), so an untrained model cannot predict.
//! - **Validated Artifacts**: a bundle is checked for version, completeness and
//!   internal consistency before it can be used.
//!
//! ## Quick Start
//!
//! ```ignore
//! use formation_recommender::predict::Recommender;
//! use formation_recommender::trainer::{run_training, TrainingConfig};
//!
//! let outcome = run_training(&TrainingConfig::default())?;
//! println!("{}", outcome.report);
//!
//! let recommender = Recommender::load(&outcome.bundle_path)?;
//! let top = recommender.recommend_json(&request, recommender.default_top_k())?;
//! ```
//!
//! ## Module Structure
//!
//! - `dataset` — member table loading, header repair and row filtering
//! - `preprocessing` — encoders, scaler, column transformer, label binarizer
//! - `model` — boosted trees, logistic regression, stacking, multi-output
//! - `loss` / `optimizer` / `regularizers` / `trainer` — gradient training loop
//! - `evaluation` — splits, cross-validation, metrics, report
//! - `bundle` — versioned artifact store
//! - `predict` — inference context, request validation, batch output
//! - `serialization` — parameter (de)serialization

/// Member table loading and cleaning.
pub mod dataset;

/// Data preprocessing transformers for the member table.
pub mod preprocessing;

/// Differentiable loss functions for model training.
pub mod loss;

/// Classifiers with compile-time state safety.
pub mod model;

/// Optimization algorithms for parameter updates.
pub mod optimizer;

/// Weight regularization strategies.
pub mod regularizers;

/// Model persistence utilities.
pub mod serialization;

/// Training loop and end-to-end training workflow.
pub mod trainer;

/// Splits, cross-validation and metrics.
pub mod evaluation;

/// Versioned store for trained artifacts.
pub mod bundle;

/// Inference over a trained bundle.
pub mod predict;

pub use bundle::{BundleError, ModelBundle};
pub use predict::{PredictionError, Recommendation, Recommender};
