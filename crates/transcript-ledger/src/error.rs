//! Error types for transcript-ledger

use thiserror::Error;

/// Errors raised while connecting to or preparing the database
#[derive(Error, Debug)]
pub enum StateError {
    /// Database connection error
    #[error("Database connection failed: {0}")]
    Connection(String),

    /// Database query error
    #[error("Database query failed: {0}")]
    Query(String),

    /// Serialization error
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Schema setup error
    #[error("Schema setup failed: {0}")]
    SchemaSetup(String),
}

impl From<surrealdb::Error> for StateError {
    fn from(err: surrealdb::Error) -> Self {
        StateError::Query(err.to_string())
    }
}

impl From<serde_json::Error> for StateError {
    fn from(err: serde_json::Error) -> Self {
        StateError::Serialization(err.to_string())
    }
}

/// Errors returned by [`crate::TranscriptLedger`] operations
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("session not found: {session_id}")]
    SessionNotFound { session_id: String },

    #[error("session already exists: {session_id}")]
    AlreadyExists { session_id: String },

    /// Turn seq was not exactly the next expected number
    #[error("sequence gap in session {session_id}: expected seq {expected}, got {got}")]
    SequenceGap {
        session_id: String,
        expected: u64,
        got: u64,
    },

    #[error("session {session_id} is terminated")]
    SessionTerminated { session_id: String },

    #[error("invalid content digest: {digest}")]
    InvalidDigest { digest: String },

    #[error("storage backend error: {0}")]
    Backend(String),
}
