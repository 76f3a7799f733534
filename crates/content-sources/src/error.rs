//! Error types for content-sources

use thiserror::Error;

/// Why a fetch failed.
#[derive(Error, Debug)]
pub enum FetchCause {
    /// Topic was blank or count was zero
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The endpoint answered with a non-success status
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Request never produced a response
    #[error("transport error: {0}")]
    Transport(String),

    /// Response body could not be decoded
    #[error("malformed response: {0}")]
    Decode(String),

    /// Local resource does not exist
    #[error("resource not found: {0}")]
    NotFound(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A provider-level fetch failure.
///
/// Multi-source providers only return this for invalid input; single-source
/// providers return it for any hard failure.
#[derive(Error, Debug)]
#[error("fetch from {provider} failed: {cause}")]
pub struct FetchError {
    /// Name of the provider that failed.
    pub provider: String,
    #[source]
    pub cause: FetchCause,
}

impl FetchError {
    pub fn new(provider: impl Into<String>, cause: FetchCause) -> Self {
        Self {
            provider: provider.into(),
            cause,
        }
    }
}

impl From<reqwest::Error> for FetchCause {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FetchCause::Decode(err.to_string())
        } else {
            FetchCause::Transport(err.to_string())
        }
    }
}

/// Result type for provider operations
pub type FetchResult<T> = std::result::Result<T, FetchError>;
