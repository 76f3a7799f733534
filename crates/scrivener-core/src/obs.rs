//! Structured observability hooks for the Scrivener session lifecycle.
//!
//! This module provides:
//! - Session-scoped tracing spans via the `SessionSpan` RAII guard
//! - Emission functions for key lifecycle events: session start, turn append,
//!   drive completion, termination, retries and degraded gate interactions
//!
//! Events are emitted at `info!` level unless noted. Filter with `RUST_LOG`;
//! pass `--json` to the CLI for JSON lines.

use tracing::{info, warn};

/// RAII guard that enters a session-scoped tracing span.
///
/// # Example
///
/// ```ignore
/// let _span = SessionSpan::enter("4c1f…");
/// // every event emitted here carries session_id = "4c1f…"
/// ```
pub struct SessionSpan {
    _span: tracing::span::EnteredSpan,
}

impl SessionSpan {
    /// Create and enter a span tagged with the session_id.
    pub fn enter(session_id: &str) -> Self {
        let span = tracing::info_span!("scrivener.session", session_id = %session_id);
        Self {
            _span: span.entered(),
        }
    }
}

/// Emit event: session created with its corpus shape.
pub fn emit_session_started(session_id: &str, source: &str, corpus_chars: usize, dropped: usize) {
    info!(
        event = "session.started",
        session_id = %session_id,
        source = %source,
        corpus_chars = corpus_chars,
        dropped_records = dropped,
    );
}

/// Emit event: a turn was appended to the transcript.
pub fn emit_turn_appended(session_id: &str, seq: u64, speaker: &str, kind: &str) {
    info!(
        event = "session.turn_appended",
        session_id = %session_id,
        seq = seq,
        speaker = %speaker,
        kind = %kind,
    );
}

/// Emit event: one round-drive finished.
pub fn emit_drive_finished(session_id: &str, outcome: &str, turns_appended: u64) {
    info!(
        event = "session.drive_finished",
        session_id = %session_id,
        outcome = %outcome,
        turns_appended = turns_appended,
    );
}

/// Emit event: session reached a terminal state.
pub fn emit_session_terminated(session_id: &str, reason: &str) {
    info!(event = "session.terminated", session_id = %session_id, reason = %reason);
}

/// Emit event: a transient generation failure will be retried (warning level).
pub fn emit_generation_retry(role: &str, attempt: u32, error: &str) {
    warn!(event = "generation.retry", role = %role, attempt = attempt, error = %error);
}

/// Emit event: the human was unavailable and an empty auto-reply was used (warning level).
pub fn emit_gate_degraded(session_id: &str, error: &dyn std::fmt::Display) {
    warn!(event = "gate.degraded", session_id = %session_id, error = %error);
}

/// Emit event: the ledger rejected a write (warning level).
pub fn emit_storage_error(session_id: &str, error: &dyn std::fmt::Display) {
    warn!(event = "session.storage_error", session_id = %session_id, error = %error);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_span_create() {
        let _span = SessionSpan::enter("test-session");
    }
}
