//! SurrealDB row types for the transcript ledger
//!
//! These mirror the `storage_traits` types in a flat, database-friendly shape.
//! Conversion happens at the `SurrealTranscriptLedger` boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage_traits::{Recipient, SessionMetadata, SessionStatus, Turn};

/// Serialize chrono DateTime as a native SurrealDB datetime
pub(crate) mod surreal_datetime {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};
    use surrealdb::sql::Datetime as SurrealDatetime;

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let sd = SurrealDatetime::from(*date);
        serde::Serialize::serialize(&sd, serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let sd = SurrealDatetime::deserialize(deserializer)?;
        Ok(DateTime::from(sd))
    }
}

/// Row in the `sessions` table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRow {
    /// SurrealDB record ID
    pub id: Option<surrealdb::sql::Thing>,
    /// Session ID (UUID string)
    pub session_id: String,
    pub corpus_digest: String,
    pub corpus_text: String,
    pub roster: serde_json::Value,
    pub max_rounds: u64,
    /// "active" | "terminated"
    pub status: String,
    pub termination: Option<serde_json::Value>,
    pub turn_count: u64,
    #[serde(with = "surreal_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "surreal_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl SessionRow {
    pub fn new(session_id: String, metadata: SessionMetadata) -> Self {
        let now = Utc::now();
        SessionRow {
            id: None,
            session_id,
            corpus_digest: metadata.corpus_digest.as_str().to_string(),
            corpus_text: metadata.corpus_text,
            roster: metadata.roster,
            max_rounds: metadata.max_rounds,
            status: SessionStatus::Active.as_str().to_string(),
            termination: None,
            turn_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.status == SessionStatus::Terminated.as_str()
    }
}

/// Row in the `turns` table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnRow {
    /// SurrealDB record ID
    pub id: Option<surrealdb::sql::Thing>,
    pub session_id: String,
    /// 0-indexed, unique per session
    pub seq: u64,
    pub speaker: String,
    /// `None` for broadcast
    pub recipient: Option<String>,
    /// "instruction" | "reply" | "human_reply"
    pub kind: String,
    pub content: String,
    #[serde(with = "surreal_datetime")]
    pub timestamp: DateTime<Utc>,
}

impl TurnRow {
    pub fn from_turn(session_id: String, turn: Turn) -> Self {
        let recipient = match turn.recipient {
            Recipient::Broadcast => None,
            Recipient::Agent(name) => Some(name),
        };
        TurnRow {
            id: None,
            session_id,
            seq: turn.seq,
            speaker: turn.speaker,
            recipient,
            kind: turn.kind.as_str().to_string(),
            content: turn.content,
            timestamp: turn.timestamp,
        }
    }
}
