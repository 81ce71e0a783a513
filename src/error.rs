//! Error taxonomy for the invoicing pipeline

use thiserror::Error;

/// Errors raised while building or processing an invoice run
#[derive(Debug, Error)]
pub enum InvoiceError {
    /// Invoice month is not a `YYYY-MM` string
    #[error("Invalid invoice month: {0}")]
    InvalidMonth(String),

    /// Raw cost could not be coerced to an exact two-place decimal
    #[error("Invalid cost {value:?}: {reason}")]
    InvalidCost { value: String, reason: String },

    /// Cluster name is neither canonical nor a known alias
    #[error("Unknown cluster name {0:?}, add it to the cluster alias table")]
    UnknownCluster(String),

    /// Billable projects absent from the allocation directory
    #[error(
        "Projects {missing:?} not found in the allocation directory and are billable! Please check the project names"
    )]
    MissingAllocations { missing: Vec<(String, String)> },

    /// A column was read before the stage that populates it ran
    #[error("Column {column:?} read before it was populated")]
    ColumnNotReady { column: &'static str },

    /// A stage dropped or duplicated rows
    #[error("Stage {stage} changed row count from {before} to {after}")]
    RowCountChanged {
        stage: &'static str,
        before: usize,
        after: usize,
    },

    /// Inconsistent PI history file
    #[error("PI history error: {0}")]
    PiHistory(String),

    /// Inconsistent prepay contract, credit or debit tables
    #[error("Prepay error: {0}")]
    Prepay(String),

    /// Rate table has no value for a metric in the invoice month
    #[error("No value for rate {metric:?} in {month}")]
    MissingRate { metric: String, month: String },

    /// Two outputs would be written to the same file
    #[error("Output {path} would be written for both {first:?} and {second:?}")]
    OutputCollision {
        path: String,
        first: String,
        second: String,
    },

    /// Required setting missing or malformed
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Allocation directory or its auth provider failed
    #[error("Allocation directory request failed ({status}): {message}")]
    Directory { status: String, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result type for invoicing operations
pub type Result<T> = std::result::Result<T, InvoiceError>;
