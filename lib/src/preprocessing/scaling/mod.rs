//! Scaling transformers for feature normalization.
//!
//! # Available Transformers
//!
//! | Transformer | Description | Use Case |
//! |-------------|-------------|----------|
//! | [`MinMaxScaler`] | Scale to [0, 1] or custom range | Bounded numeric features |
//!
//! # Example
//!
//! ```ignore
//! use formation_recommender::preprocessing::scaling::MinMaxScaler;
//! use formation_recommender::preprocessing::Transformer;
//!
//! let fitted = MinMaxScaler::new().fit(&frame)?;
//! let scaled = fitted.transform(&new_frame)?;
//! ```

pub mod minmax;

pub use minmax::{FittedMinMaxScaler, MinMaxScaler, MinMaxScalerConfig, MinMaxScalerParams};
