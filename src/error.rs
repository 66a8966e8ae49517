use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    Missing(&'static str),

    #[error("environment variable {var} has invalid value {value:?}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database driver error: {0}")]
    Driver(#[from] mongodb::error::Error),

    #[error("connection does not support the document store: {0}")]
    Unsupported(String),

    #[error("failed to encode document: {0}")]
    Serialization(#[from] mongodb::bson::ser::Error),

    #[error("connection is closed")]
    Closed,

    #[error("store backend failure: {0}")]
    Backend(String),

    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;
