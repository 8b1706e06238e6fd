//! Serialization of fitted parameters.
//!
//! Every fitted component (encoders, scalers, trees, stacks) exposes a plain
//! `Params` struct holding only numbers and strings. Those structs are turned
//! into bytes through [`SerializableParams`], which keeps the on-disk format
//! independent of the in-memory representation (e.g. `HashMap` lookups or
//! `ndarray` buffers rebuilt on load).

use std::error::Error;

/// A parameter representation that can be serialized to and from bytes.
///
/// Implementors should contain only plain data (`Vec<f64>`, `String`, scalars),
/// never lookup tables that can be rebuilt from that data.
pub trait SerializableParams: Sized {
    /// The error type returned during (de)serialization.
    type Error: Error + Send + Sync + 'static;

    /// Serialize the parameters into a byte buffer.
    fn to_bytes(&self) -> Result<Vec<u8>, Self::Error>;

    /// Deserialize the parameters from a byte buffer.
    fn from_bytes(bytes: &[u8]) -> Result<Self, Self::Error>;
}

impl<T> SerializableParams for T
where
    T: serde::Serialize + for<'de> serde::Deserialize<'de>,
{
    type Error = bincode::Error;

    fn to_bytes(&self) -> Result<Vec<u8>, Self::Error> {
        bincode::serialize(self)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, Self::Error> {
        bincode::deserialize(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Thresholds {
        values: Vec<f64>,
        name: String,
    }

    #[test]
    fn test_params_bytes_preserve_exact_floats() {
        let params = Thresholds {
            values: vec![0.1 + 0.2, f64::MIN_POSITIVE, -1.0 / 3.0],
            name: "cut".to_string(),
        };
        let bytes = params.to_bytes().unwrap();
        let restored = Thresholds::from_bytes(&bytes).unwrap();
        assert_eq!(restored, params);
        assert_eq!(restored.values[0].to_bits(), params.values[0].to_bits());
    }

    #[test]
    fn test_params_from_garbage_fails() {
        let result = Thresholds::from_bytes(&[0xff, 0xff, 0xff, 0xff]);
        assert!(result.is_err());
    }
}
