//! SurrealDB-backed TranscriptLedger implementation
//!
//! Uses `schema::SessionRow` and `schema::TurnRow` for persistence,
//! converting to/from `storage_traits` types at the boundary.

use async_trait::async_trait;
use chrono::Utc;
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info};

use crate::error::{StateError, StorageError};
use crate::migrations;
use crate::schema::{SessionRow, TurnRow};
use crate::storage_traits::{
    ContentDigest, Recipient, SessionId, SessionMetadata, SessionRecord, SessionStatus,
    StorageResult, TranscriptLedger, Turn, TurnKind,
};

const NAMESPACE: &str = "scrivener";
const DATABASE: &str = "main";

#[derive(Debug, serde::Deserialize)]
struct CountRow {
    n: u64,
}

fn backend(e: impl std::fmt::Display) -> StorageError {
    StorageError::Backend(e.to_string())
}

/// SurrealDB-backed implementation of [`TranscriptLedger`].
pub struct SurrealTranscriptLedger {
    db: Surreal<Any>,
}

impl SurrealTranscriptLedger {
    /// Create an in-memory instance for testing.
    ///
    /// Connects to `mem://`, selects `scrivener/main`, and runs `init_schema`.
    pub async fn in_memory() -> crate::Result<Self> {
        Self::connect("mem://").await
    }

    /// Create from environment variables.
    ///
    /// Uses `SURREALDB_URL` when set, otherwise local persistence in
    /// `.scrivener/db`.
    pub async fn from_env() -> crate::Result<Self> {
        if let Ok(url) = std::env::var("SURREALDB_URL") {
            return Self::connect(&url).await;
        }

        let path = ".scrivener/db";
        std::fs::create_dir_all(path).map_err(|e| {
            StateError::Connection(format!(
                "Failed to create database directory {}: {}",
                path, e
            ))
        })?;
        info!("No SURREALDB_URL found, using local persistence in {}", path);
        Self::connect(&format!("surrealkv://{}", path)).await
    }

    /// Connect to an explicit endpoint (`mem://`, `surrealkv://…`, `ws://…`).
    pub async fn connect(url: &str) -> crate::Result<Self> {
        let db = surrealdb::engine::any::connect(url)
            .await
            .map_err(|e| StateError::Connection(format!("Failed to connect to {}: {}", url, e)))?;

        db.use_ns(NAMESPACE)
            .use_db(DATABASE)
            .await
            .map_err(|e| StateError::Connection(e.to_string()))?;

        migrations::init_schema(&db).await?;
        info!("SurrealTranscriptLedger connected ({})", url);
        Ok(Self { db })
    }

    // -- private helpers -----------------------------------------------------

    async fn fetch_session(&self, sid: &str) -> StorageResult<SessionRow> {
        let sid_owned = sid.to_string();
        let mut res = self
            .db
            .query("SELECT * FROM sessions WHERE session_id = $sid")
            .bind(("sid", sid_owned))
            .await
            .map_err(backend)?;

        let rows: Vec<SessionRow> = res.take(0).map_err(backend)?;

        rows.into_iter()
            .next()
            .ok_or_else(|| StorageError::SessionNotFound {
                session_id: sid.to_string(),
            })
    }

    async fn fetch_active(&self, sid: &str) -> StorageResult<SessionRow> {
        let row = self.fetch_session(sid).await?;
        if row.is_terminated() {
            return Err(StorageError::SessionTerminated {
                session_id: sid.to_string(),
            });
        }
        Ok(row)
    }

    async fn count_turns(&self, sid: &str) -> StorageResult<u64> {
        let sid_owned = sid.to_string();
        let mut res = self
            .db
            .query("SELECT count() AS n FROM turns WHERE session_id = $sid GROUP ALL")
            .bind(("sid", sid_owned))
            .await
            .map_err(backend)?;

        let row: Option<CountRow> = res.take(0).map_err(backend)?;
        Ok(row.map_or(0, |r| r.n))
    }

    fn row_to_record(row: SessionRow) -> StorageResult<SessionRecord> {
        let status = match row.status.as_str() {
            "active" => SessionStatus::Active,
            "terminated" => SessionStatus::Terminated,
            other => return Err(backend(format!("unknown session status: {other}"))),
        };

        Ok(SessionRecord {
            session_id: SessionId(row.session_id),
            metadata: SessionMetadata {
                corpus_digest: ContentDigest::try_from(row.corpus_digest)?,
                corpus_text: row.corpus_text,
                roster: row.roster,
                max_rounds: row.max_rounds,
            },
            status,
            termination: row.termination,
            turn_count: row.turn_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    fn row_to_turn(row: TurnRow) -> StorageResult<Turn> {
        Ok(Turn {
            seq: row.seq,
            speaker: row.speaker,
            recipient: row
                .recipient
                .map(Recipient::Agent)
                .unwrap_or(Recipient::Broadcast),
            kind: row.kind.parse::<TurnKind>()?,
            content: row.content,
            timestamp: row.timestamp,
        })
    }
}

#[async_trait]
impl TranscriptLedger for SurrealTranscriptLedger {
    async fn create_session(&self, metadata: SessionMetadata) -> StorageResult<SessionId> {
        let session_id = SessionId::new();
        let row = SessionRow::new(session_id.0.clone(), metadata);

        debug!(session_id = %session_id, "creating session");

        let _created: Option<SessionRow> = self
            .db
            .create("sessions")
            .content(row)
            .await
            .map_err(backend)?;

        Ok(session_id)
    }

    async fn append_turn(&self, session_id: &SessionId, turn: Turn) -> StorageResult<()> {
        self.fetch_active(&session_id.0).await?;
        // The stored turns are authoritative; `turn_count` can lag them if a
        // previous append stopped between the two writes below.
        let expected = self.count_turns(&session_id.0).await?;
        if turn.seq != expected {
            return Err(StorageError::SequenceGap {
                session_id: session_id.0.clone(),
                expected,
                got: turn.seq,
            });
        }

        let next = turn.seq + 1;
        let turn_row = TurnRow::from_turn(session_id.0.clone(), turn);
        let _created: Option<TurnRow> = self
            .db
            .create("turns")
            .content(turn_row)
            .await
            .map_err(backend)?;

        let sid_owned = session_id.0.clone();
        let now = surrealdb::sql::Datetime::from(Utc::now());
        self.db
            .query("UPDATE sessions SET turn_count = $n, updated_at = $now WHERE session_id = $sid")
            .bind(("n", next))
            .bind(("now", now))
            .bind(("sid", sid_owned))
            .await
            .map_err(backend)?;

        Ok(())
    }

    async fn mark_terminated(
        &self,
        session_id: &SessionId,
        reason: serde_json::Value,
    ) -> StorageResult<()> {
        self.fetch_active(&session_id.0).await?;

        let sid_owned = session_id.0.clone();
        let now = surrealdb::sql::Datetime::from(Utc::now());
        self.db
            .query(
                "UPDATE sessions SET status = $status, termination = $reason, updated_at = $now \
                 WHERE session_id = $sid",
            )
            .bind(("status", SessionStatus::Terminated.as_str()))
            .bind(("reason", reason))
            .bind(("now", now))
            .bind(("sid", sid_owned))
            .await
            .map_err(backend)?;

        Ok(())
    }

    async fn get_session(&self, session_id: &SessionId) -> StorageResult<SessionRecord> {
        let row = self.fetch_session(&session_id.0).await?;
        Self::row_to_record(row)
    }

    async fn get_turns(&self, session_id: &SessionId) -> StorageResult<Vec<Turn>> {
        // Verify session exists
        self.fetch_session(&session_id.0).await?;

        let sid_owned = session_id.0.clone();
        let mut res = self
            .db
            .query("SELECT * FROM turns WHERE session_id = $sid ORDER BY seq ASC")
            .bind(("sid", sid_owned))
            .await
            .map_err(backend)?;

        let rows: Vec<TurnRow> = res.take(0).map_err(backend)?;
        rows.into_iter().map(Self::row_to_turn).collect()
    }

    async fn list_sessions(&self) -> StorageResult<Vec<SessionRecord>> {
        let mut res = self
            .db
            .query("SELECT * FROM sessions ORDER BY created_at DESC")
            .await
            .map_err(backend)?;
        let rows: Vec<SessionRow> = res.take(0).map_err(backend)?;

        rows.into_iter().map(Self::row_to_record).collect()
    }
}
