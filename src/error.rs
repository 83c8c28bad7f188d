use std::path::PathBuf;
use thiserror::Error;

/// Failures that prevent a structured response from being obtained.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to encode multipart payload: {0}")]
    Encode(#[source] reqwest::Error),
    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("failed to read response body: {0}")]
    Body(#[source] reqwest::Error),
    #[error("response body is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Problems turning user input into a form submission.
#[derive(Debug, Error)]
pub enum FormError {
    #[error("expected NAME=VALUE, got {0:?}")]
    MissingSeparator(String),
    #[error("field name must not be empty in {0:?}")]
    EmptyName(String),
    #[error("file path must not be empty in {0:?}")]
    EmptyPath(String),
    #[error("cannot read {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
