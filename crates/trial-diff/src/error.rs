//! Error types for value conversion and input introspection.

use std::fmt;

use thiserror::Error;

/// Failure while converting a `Serialize` value into a [`crate::Value`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("{0}")]
    Custom(String),
    #[error("integer {0} does not fit in 64 bits")]
    IntegerOutOfRange(String),
    #[error("map value serialized without a key")]
    DanglingMapValue,
}

impl serde::ser::Error for ValueError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Self::Custom(msg.to_string())
    }
}

/// Failure of an [`crate::Input`] accessor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("cannot convert {kind} to a scalar")]
    UnsupportedConversion { kind: String },
    #[error("invalid bool {0:?}")]
    InvalidBool(String),
    #[error("invalid int {0:?}")]
    InvalidInt(String),
    #[error("invalid float {0:?}")]
    InvalidFloat(String),
    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("invalid key: {0}")]
    InvalidKey(String),
    #[error("cannot inspect input: {0}")]
    Value(#[from] ValueError),
}
