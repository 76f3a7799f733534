//! SurrealDB schema migrations and initialization

use crate::Result;
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info};

/// Initialize the transcript tables in SurrealDB
///
/// Safe to call multiple times (idempotent).
pub async fn init_schema(db: &Surreal<Any>) -> Result<()> {
    info!("Initializing transcript ledger schema");

    init_sessions_table(db).await?;
    init_turns_table(db).await?;

    info!("Transcript ledger schema initialization complete");
    Ok(())
}

/// Initialize `sessions` table
///
/// Schema:
/// ```text
/// TABLE sessions {
///   session_id:     STRING (unique)
///   corpus_digest:  STRING (indexed)
///   corpus_text:    STRING
///   roster:         OBJECT
///   max_rounds:     INT
///   status:         STRING (active | terminated)
///   termination:    OBJECT?
///   turn_count:     INT
///   created_at:     DATETIME (indexed)
///   updated_at:     DATETIME
/// }
/// ```
///
/// `status` moves active → terminated once; enforced in the ledger.
async fn init_sessions_table(db: &Surreal<Any>) -> Result<()> {
    debug!("Initializing sessions table");

    let sql = r#"
        DEFINE TABLE sessions AS
            SCHEMALESS
            PERMISSIONS
                FOR create FULL
                FOR read FULL
                FOR update FULL
                FOR delete NONE;

        DEFINE INDEX idx_session_id ON TABLE sessions COLUMNS session_id UNIQUE;
        DEFINE INDEX idx_corpus_digest ON TABLE sessions COLUMNS corpus_digest;
        DEFINE INDEX idx_created_at ON TABLE sessions COLUMNS created_at DESC;
    "#;

    db.query(sql).await?;
    info!("✓ sessions table initialized");
    Ok(())
}

/// Initialize `turns` table
///
/// Schema:
/// ```text
/// TABLE turns {
///   session_id:  STRING (foreign key to sessions.session_id)
///   seq:         INT (0-indexed, gapless within session)
///   speaker:     STRING
///   recipient:   STRING? (NONE = broadcast)
///   kind:        STRING (instruction | reply | human_reply)
///   content:     STRING
///   timestamp:   DATETIME
/// }
/// ```
///
/// `(session_id, seq)` is unique, so a repeated seq can never be stored even
/// if two writers race past the application-level gap check.
async fn init_turns_table(db: &Surreal<Any>) -> Result<()> {
    debug!("Initializing turns table");

    let sql = r#"
        DEFINE TABLE turns AS
            SCHEMALESS
            PERMISSIONS
                FOR create FULL
                FOR read FULL
                FOR update NONE
                FOR delete NONE;

        DEFINE INDEX idx_session_id_seq ON TABLE turns COLUMNS session_id, seq UNIQUE;
        DEFINE INDEX idx_session_id ON TABLE turns COLUMNS session_id;
        DEFINE INDEX idx_speaker ON TABLE turns COLUMNS speaker;
    "#;

    db.query(sql).await?;
    info!("✓ turns table initialized");
    Ok(())
}
