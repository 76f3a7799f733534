//! Error types for the generation capability.

/// A failed generation call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    /// Worth retrying: timeouts, rate limits, upstream 5xx, dropped connections.
    #[error("transient generation failure: {0}")]
    Transient(String),

    /// Retrying will not help. Ends the current round-drive.
    #[error("fatal generation failure: {0}")]
    Fatal(String),
}

impl GenerationError {
    pub fn is_transient(&self) -> bool {
        matches!(self, GenerationError::Transient(_))
    }
}

/// Result type for generation calls.
pub type GenerationResult<T> = std::result::Result<T, GenerationError>;
