//! Shared error types for the remote crate.

use thiserror::Error;

/// Errors surfaced by `SyncClient` implementations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RemoteError {
    #[error("request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("response body could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("backend error: {0}")]
    Backend(String),
}

/// Errors raised while assembling an `ApiConfig`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("no auth token configured")]
    MissingCredentials,

    #[error("invalid API base url {raw:?}: {reason}")]
    InvalidBaseUrl { raw: String, reason: String },

    #[error("unknown progress kind {0:?} (expected \"quiz\" or \"test\")")]
    InvalidKind(String),
}
