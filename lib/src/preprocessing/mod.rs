//! Data preprocessing transformers for the member table.
//!
//! Transformers follow a fitted/unfitted split: an unfitted transformer holds
//! hyperparameters, `fit` learns from data and returns a separate fitted type
//! that only transforms and serializes.
//!
//! # Core Traits
//!
//! - [`Transformer`]: Unfitted transformer with hyperparameters
//! - [`FittedTransformer`]: Fitted transformer ready for inference
//!
//! # Available Transformers
//!
//! ## Encoding
//! - [`OneHotEncoder`]: Indicator columns per category, optional drop-first
//! - [`OrdinalEncoder`]: Category ranks in fit-time order
//! - [`MultiLabelBinarizer`]: Label lists to a multi-hot target matrix
//!
//! ## Scaling
//! - [`MinMaxScaler`]: Scale to [0, 1] or custom range
//!
//! ## Composition
//! - [`ColumnTransformer`]: One step per named column group, outputs concatenated
//! - [`feature_pipeline`]: The canonical member-table pipeline
//!
//! # Example
//!
//! ```ignore
//! use formation_recommender::preprocessing::{feature_pipeline, FittedColumnTransformer, Transformer};
//!
//! let fitted = feature_pipeline().fit(&training_frame)?;
//! let x_train = fitted.transform(&training_frame)?;
//!
//! // Save for later use
//! fitted.save_to_file("preprocessor.bin")?;
//! let loaded = FittedColumnTransformer::load_from_file("preprocessor.bin")?;
//! ```

pub mod column_transformer;
pub mod encoding;
pub mod error;
pub mod scaling;
pub mod traits;

// Re-export main types
pub use column_transformer::{
    feature_pipeline, ColumnTransformer, ColumnTransformerParams, FittedColumnTransformer,
};
pub use encoding::{
    DropPolicy, FittedMultiLabelBinarizer, FittedOneHotEncoder, FittedOrdinalEncoder,
    HandleUnknown, MultiLabelBinarizer, MultiLabelBinarizerParams, OneHotEncoder,
    OneHotEncoderParams, OrdinalEncoder, OrdinalEncoderParams,
};
pub use error::PreprocessingError;
pub use scaling::{FittedMinMaxScaler, MinMaxScaler, MinMaxScalerConfig, MinMaxScalerParams};
pub use traits::{FittedTransformer, Transformer};
