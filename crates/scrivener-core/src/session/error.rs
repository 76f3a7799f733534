//! Error types for the session entry point.

use content_sources::{FetchError, SourceKind};
use transcript_ledger::StorageError;

use crate::orchestration::OrchestrationError;
use crate::registry::RegistryError;

/// Errors surfaced to whatever drives sessions (the CLI, a server).
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("no active session {session_id}")]
    SessionNotFound { session_id: String },

    /// The session was closed or has terminated.
    #[error("session {session_id} is closed")]
    SessionClosed { session_id: String },

    #[error("no content provider registered for source {0}")]
    UnknownSource(SourceKind),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("cannot build agent roster: {0}")]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Orchestration(OrchestrationError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<OrchestrationError> for SessionError {
    fn from(err: OrchestrationError) -> Self {
        match err {
            OrchestrationError::SessionClosed { session_id } => {
                SessionError::SessionClosed { session_id }
            }
            other => SessionError::Orchestration(other),
        }
    }
}

/// Result type for session operations.
pub type SessionResult<T> = std::result::Result<T, SessionError>;
