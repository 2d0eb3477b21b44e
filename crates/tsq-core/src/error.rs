use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Arrow error: {0}")]
    ArrowError(#[from] arrow::error::ArrowError),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("Schema error: {0}")]
    SchemaError(String),

    #[error("Invalid duration: {0}")]
    InvalidDuration(String),
}

pub type Result<T> = std::result::Result<T, QueryError>;
