//! Transcript-Ledger: persistence for Scrivener sessions
//!
//! Stores one record per session plus its append-only, gapless list of turns
//! so a conversation can be inspected or resumed after the process exits.
//!
//! ## Key Components
//!
//! - `TranscriptLedger`: the async storage trait
//! - `MemoryTranscriptLedger`: in-memory fake for tests
//! - `SurrealTranscriptLedger`: SurrealDB implementation (`mem://`, `surrealkv://`, `ws://`)

mod error;
pub mod fakes;
pub mod migrations;
mod schema;
pub mod storage_traits;
pub mod surreal_ledger;

pub use error::{StateError, StorageError};
pub use storage_traits::{
    ContentDigest, Recipient, SessionId, SessionMetadata, SessionRecord, SessionStatus,
    StorageResult, TranscriptLedger, Turn, TurnKind,
};
pub use surreal_ledger::SurrealTranscriptLedger;

/// Result type for transcript-ledger setup operations
pub type Result<T> = std::result::Result<T, StateError>;
