//! Error types for the human gate.

use super::capability::InteractionError;

/// Errors produced by the human gate.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// The interaction capability disconnected while the gate was suspended.
    #[error("human unavailable: {0}")]
    HumanUnavailable(#[from] InteractionError),

    #[error("invalid feedback pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Result type for gate operations.
pub type GateResult<T> = std::result::Result<T, GateError>;
