//! Storage trait definitions for Scrivener transcripts
//!
//! `TranscriptLedger` is the single persistence seam: one session row plus an
//! append-only, gapless list of turns per session. The trait is async and
//! backend-agnostic. An in-memory fake is provided for testing via the
//! `fakes` module.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::StorageError;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Content digest (SHA-256 hex string).
///
/// The inner field is private so the string is always lowercase hex produced
/// by `from_bytes` or validated via `TryFrom<String>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentDigest(String);

impl ContentDigest {
    /// Compute the SHA-256 digest of the given bytes.
    pub fn from_bytes(data: &[u8]) -> Self {
        use sha2::Digest;
        let mut hasher = Sha256::new();
        hasher.update(data);
        ContentDigest(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form (first 12 hex chars).
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl TryFrom<String> for ContentDigest {
    type Error = StorageError;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        if s.len() != 64 || !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(StorageError::InvalidDigest { digest: s });
        }
        Ok(ContentDigest(s.to_ascii_lowercase()))
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque session identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    /// Generate a new random SessionId
    pub fn new() -> Self {
        SessionId(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        SessionId(s.to_string())
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Turns
// ---------------------------------------------------------------------------

/// Who a turn is addressed to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recipient {
    Broadcast,
    Agent(String),
}

impl std::fmt::Display for Recipient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Recipient::Broadcast => write!(f, "broadcast"),
            Recipient::Agent(name) => write!(f, "{name}"),
        }
    }
}

/// What produced a turn.
///
/// `Instruction` turns carry operator input (the seed brief or a resume
/// instruction). They are not counted as rounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnKind {
    Instruction,
    Reply,
    HumanReply,
}

impl TurnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnKind::Instruction => "instruction",
            TurnKind::Reply => "reply",
            TurnKind::HumanReply => "human_reply",
        }
    }

    /// Whether the turn counts against the round ceiling.
    pub fn is_round(&self) -> bool {
        !matches!(self, TurnKind::Instruction)
    }
}

impl std::str::FromStr for TurnKind {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "instruction" => Ok(TurnKind::Instruction),
            "reply" => Ok(TurnKind::Reply),
            "human_reply" => Ok(TurnKind::HumanReply),
            other => Err(StorageError::Backend(format!("unknown turn kind: {other}"))),
        }
    }
}

/// One message in a session's conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Position in the transcript, starting at 0
    pub seq: u64,
    /// Role name of the speaker
    pub speaker: String,
    pub recipient: Recipient,
    pub kind: TurnKind,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn new(
        seq: u64,
        speaker: impl Into<String>,
        recipient: Recipient,
        kind: TurnKind,
        content: impl Into<String>,
    ) -> Self {
        Turn {
            seq,
            speaker: speaker.into(),
            recipient,
            kind,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

/// Metadata fixed when a session is created
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub corpus_digest: ContentDigest,
    /// Rendered corpus text the session was seeded from
    pub corpus_text: String,
    /// Role roster, serialized by the caller
    pub roster: serde_json::Value,
    pub max_rounds: u64,
}

/// Lifecycle status of a persisted session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    Active,
    Terminated,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Terminated => "terminated",
        }
    }
}

/// Full session record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: SessionId,
    pub metadata: SessionMetadata,
    pub status: SessionStatus,
    /// Caller-defined termination reason, set by `mark_terminated`
    pub termination: Option<serde_json::Value>,
    /// Number of turns appended so far
    pub turn_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Transcript ledger.
///
/// Guarantees:
/// - Turns of a session have seq exactly `0..n-1`; `append_turn` rejects any
///   other seq with `StorageError::SequenceGap`.
/// - A session transitions Active → Terminated once; terminated sessions
///   accept no further turns.
/// - `get_turns` returns turns in seq order.
#[async_trait]
pub trait TranscriptLedger: Send + Sync {
    /// Create a new session, returning its unique ID.
    async fn create_session(&self, metadata: SessionMetadata) -> StorageResult<SessionId>;

    /// Append the next turn. `turn.seq` must equal the current turn count.
    async fn append_turn(&self, session_id: &SessionId, turn: Turn) -> StorageResult<()>;

    /// Mark a session as terminated with a caller-defined reason.
    async fn mark_terminated(
        &self,
        session_id: &SessionId,
        reason: serde_json::Value,
    ) -> StorageResult<()>;

    /// Retrieve a session record by ID.
    async fn get_session(&self, session_id: &SessionId) -> StorageResult<SessionRecord>;

    /// Retrieve all turns for a session, ordered by seq.
    async fn get_turns(&self, session_id: &SessionId) -> StorageResult<Vec<Turn>>;

    /// List sessions, newest first.
    async fn list_sessions(&self) -> StorageResult<Vec<SessionRecord>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_is_stable_and_hex() {
        let d1 = ContentDigest::from_bytes(b"corpus");
        let d2 = ContentDigest::from_bytes(b"corpus");
        assert_eq!(d1, d2);
        assert_eq!(d1.as_str().len(), 64);
        assert_eq!(d1.short().len(), 12);
    }

    #[test]
    fn test_digest_try_from_rejects_bad_input() {
        let err = ContentDigest::try_from("xyz".to_string()).unwrap_err();
        assert!(matches!(err, StorageError::InvalidDigest { .. }));
    }

    #[test]
    fn test_turn_kind_round_counting() {
        assert!(!TurnKind::Instruction.is_round());
        assert!(TurnKind::Reply.is_round());
        assert!(TurnKind::HumanReply.is_round());
    }

    #[test]
    fn test_turn_kind_str_round_trip() {
        for kind in [TurnKind::Instruction, TurnKind::Reply, TurnKind::HumanReply] {
            assert_eq!(kind.as_str().parse::<TurnKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_recipient_display() {
        assert_eq!(Recipient::Broadcast.to_string(), "broadcast");
        assert_eq!(Recipient::Agent("Writer".into()).to_string(), "Writer");
    }
}
