//! Error types for the conversation orchestrator.

use transcript_ledger::StorageError;

use crate::human_gate::GateError;

/// Errors produced by the orchestration layer.
#[derive(Debug, thiserror::Error)]
pub enum OrchestrationError {
    #[error("cannot {operation} a session in state {actual}")]
    InvalidState {
        operation: &'static str,
        actual: &'static str,
    },

    /// The session is terminated; no further instructions are accepted.
    #[error("session {session_id} is closed")]
    SessionClosed { session_id: String },

    #[error("persisted transcript is inconsistent: {detail}")]
    CorruptTranscript { detail: String },

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("human gate error: {0}")]
    Gate(#[from] GateError),
}

/// Result type for orchestration operations.
pub type OrchestrationResult<T> = std::result::Result<T, OrchestrationError>;
