//! In-memory fake for the transcript ledger (testing only)
//!
//! `MemoryTranscriptLedger` satisfies the `TranscriptLedger` contract without
//! any external dependencies.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::StorageError;
use crate::storage_traits::*;

#[derive(Debug)]
struct SessionState {
    record: SessionRecord,
    turns: Vec<Turn>,
}

/// In-memory transcript ledger backed by a `HashMap<session_id, state>`.
#[derive(Debug, Default)]
pub struct MemoryTranscriptLedger {
    sessions: Mutex<HashMap<String, SessionState>>,
}

impl MemoryTranscriptLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

fn not_found(session_id: &SessionId) -> StorageError {
    StorageError::SessionNotFound {
        session_id: session_id.0.clone(),
    }
}

#[async_trait]
impl TranscriptLedger for MemoryTranscriptLedger {
    async fn create_session(&self, metadata: SessionMetadata) -> StorageResult<SessionId> {
        let session_id = SessionId::new();
        let now = Utc::now();
        let record = SessionRecord {
            session_id: session_id.clone(),
            metadata,
            status: SessionStatus::Active,
            termination: None,
            turn_count: 0,
            created_at: now,
            updated_at: now,
        };
        let mut sessions = self.sessions.lock().unwrap();
        sessions.insert(
            session_id.0.clone(),
            SessionState {
                record,
                turns: Vec::new(),
            },
        );
        Ok(session_id)
    }

    async fn append_turn(&self, session_id: &SessionId, turn: Turn) -> StorageResult<()> {
        let mut sessions = self.sessions.lock().unwrap();
        let state = sessions
            .get_mut(&session_id.0)
            .ok_or_else(|| not_found(session_id))?;
        if state.record.status == SessionStatus::Terminated {
            return Err(StorageError::SessionTerminated {
                session_id: session_id.0.clone(),
            });
        }
        let expected = state.turns.len() as u64;
        if turn.seq != expected {
            return Err(StorageError::SequenceGap {
                session_id: session_id.0.clone(),
                expected,
                got: turn.seq,
            });
        }
        state.turns.push(turn);
        state.record.turn_count = expected + 1;
        state.record.updated_at = Utc::now();
        Ok(())
    }

    async fn mark_terminated(
        &self,
        session_id: &SessionId,
        reason: serde_json::Value,
    ) -> StorageResult<()> {
        let mut sessions = self.sessions.lock().unwrap();
        let state = sessions
            .get_mut(&session_id.0)
            .ok_or_else(|| not_found(session_id))?;
        if state.record.status == SessionStatus::Terminated {
            return Err(StorageError::SessionTerminated {
                session_id: session_id.0.clone(),
            });
        }
        state.record.status = SessionStatus::Terminated;
        state.record.termination = Some(reason);
        state.record.updated_at = Utc::now();
        Ok(())
    }

    async fn get_session(&self, session_id: &SessionId) -> StorageResult<SessionRecord> {
        let sessions = self.sessions.lock().unwrap();
        sessions
            .get(&session_id.0)
            .map(|s| s.record.clone())
            .ok_or_else(|| not_found(session_id))
    }

    async fn get_turns(&self, session_id: &SessionId) -> StorageResult<Vec<Turn>> {
        let sessions = self.sessions.lock().unwrap();
        sessions
            .get(&session_id.0)
            .map(|s| s.turns.clone())
            .ok_or_else(|| not_found(session_id))
    }

    async fn list_sessions(&self) -> StorageResult<Vec<SessionRecord>> {
        let sessions = self.sessions.lock().unwrap();
        let mut records: Vec<SessionRecord> =
            sessions.values().map(|s| s.record.clone()).collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }
}
