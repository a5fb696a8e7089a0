//! Error types for repasseweb-store

use repasseweb_core::CoreError;
use thiserror::Error;

/// Failures while talking to or loading a backend
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to read seed file {path}: {source}")]
    SeedIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid seed file {path}: {message}")]
    SeedParse { path: String, message: String },

    #[error("Backend URL is not configured")]
    MissingUrl,

    #[error("Invalid API key header: {0}")]
    InvalidApiKey(String),

    #[error("{0}")]
    Http(#[from] reqwest::Error),

    /// Non-success answer from the database, carrying its message verbatim
    #[error("{message}")]
    Status { status: u16, message: String },

    #[error("Unexpected response from {resource}: {message}")]
    Decode { resource: String, message: String },
}

/// Result type with StoreError
pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for CoreError {
    fn from(error: StoreError) -> Self {
        CoreError::backend(error.to_string())
    }
}
