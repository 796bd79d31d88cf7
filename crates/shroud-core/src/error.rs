//! Error types for shroud-core

use thiserror::Error;

use crate::TypeTag;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown network: {0}")]
    UnknownNetwork(String),

    #[error("Value {value} out of range for {tag}")]
    ValueOutOfRange { tag: TypeTag, value: String },

    #[error("Invalid address format: {0}")]
    InvalidAddressFormat(String),

    #[error("Unknown type tag: {0}")]
    UnknownTypeTag(String),

    #[error("Cannot interpret {value} as {expected}")]
    InvalidPlaintext { expected: String, value: String },
}
