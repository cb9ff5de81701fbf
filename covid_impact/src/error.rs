//! Error types.

use polars::error::PolarsError;

#[derive(thiserror::Error, Debug)]
pub enum DashboardError {
    #[error("File not found: {0}")]
    FileNotFound(String),
    #[error("Failed to parse '{path}': {reason}")]
    ParseError { path: String, reason: String },
    #[error("Expected column absent: {0}")]
    SchemaMismatch(String),
    #[error("Empty result: {0}")]
    EmptyResult(String),
    #[error("Duplicate rows for keys [{keys}]: {example}")]
    DuplicateKeys { keys: String, example: String },
    #[error("Unknown page: {0}")]
    UnknownPage(String),
    #[error("Unknown control: {0}")]
    UnknownControl(String),
    #[error("Invalid selection for control '{control}': {reason}")]
    InvalidSelection { control: String, reason: String },
    #[error("Wrapped polars error: {0}")]
    PolarsError(PolarsError),
    #[error("Wrapped serde JSON error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),
    #[error("Wrapped IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Wrapped anyhow error: {0}")]
    AnyhowError(#[from] anyhow::Error),
}

impl From<PolarsError> for DashboardError {
    fn from(value: PolarsError) -> Self {
        match value {
            PolarsError::ColumnNotFound(name) => DashboardError::SchemaMismatch(name.to_string()),
            other => DashboardError::PolarsError(other),
        }
    }
}

pub type DashboardResult<T> = Result<T, DashboardError>;
