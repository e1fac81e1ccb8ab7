//! Structured errors for the clustering engine

use thiserror::Error;

/// Request-level failures: the inputs are well-formed records but the request
/// cannot be served as asked.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("dataset is empty")]
    EmptyDataset,

    #[error("cannot create {requested} clusters from {n_items} records")]
    InvalidClusterCount { requested: usize, n_items: usize },

    #[error("cluster count must be a positive integer, got '{0}'")]
    MalformedClusterCount(String),

    #[error("cluster count must be positive, got {0}")]
    NonPositiveClusterCount(i64),

    #[error("invalid parameter '{name}': {message}")]
    InvalidParameter { name: &'static str, message: String },

    #[error("invalid distance matrix: {0}")]
    InvalidDistanceMatrix(String),
}

/// Record-level failures: a record does not carry usable numeric features.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataError {
    #[error("record '{record}' is missing feature '{metric}'")]
    MissingFeature { record: String, metric: &'static str },

    #[error("record '{record}' has non-numeric value '{value}' for feature '{metric}'")]
    NonNumeric {
        record: String,
        metric: &'static str,
        value: String,
    },

    #[error("record '{record}' has non-finite value {value} for feature '{metric}'")]
    NonFinite {
        record: String,
        metric: &'static str,
        value: f64,
    },

    #[error("record '{record}' is not an object")]
    NotAnObject { record: String },

    #[error("expected a JSON array of records")]
    NotAnArray,

    #[error("input is missing column '{column}'")]
    MissingColumn { column: String },
}

/// Top-level error returned by every fallible engine operation.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error("failed to read records: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("failed to parse records: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    pub fn is_data(&self) -> bool {
        matches!(self, Error::Data(_))
    }
}
