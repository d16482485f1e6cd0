//! Error type shared by the store, the analytics core and the request layer.

use thiserror::Error;

/// Errors returned by every core operation.
///
/// Callers distinguish "no data" (`NotFound`) from infrastructure failure
/// (`Storage`) by variant, never by message.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrafficError {
    /// Malformed or missing input, rejected before reaching the store.
    #[error("Validation error: {0}")]
    Validation(String),
    /// No camera history for classification, or no records in a range.
    #[error("Not found: {0}")]
    NotFound(String),
    /// Read or write failure in the underlying store.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<postgres::Error> for TrafficError {
    fn from(err: postgres::Error) -> Self {
        TrafficError::Storage(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TrafficError>;
