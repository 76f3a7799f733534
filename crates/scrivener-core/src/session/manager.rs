//! Session entry point.
//!
//! One [`SessionHandle`] per live session. The handle's orchestrator sits
//! behind a FIFO-fair `tokio::sync::Mutex`, so instructions for one session
//! run one round-drive at a time in arrival order while different sessions
//! proceed independently. The session map lock is only held to look up or
//! insert a handle, never across a drive.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use content_sources::{
    ContentProvider, ForumProvider, LocalCorpusProvider, NewsProvider, SourceKind,
};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch, Mutex, RwLock};
use tracing::{info, warn};

use transcript_ledger::{SessionId, SessionMetadata, SessionRecord, TranscriptLedger, Turn};

use super::error::{SessionError, SessionResult};
use crate::config::ScrivenerConfig;
use crate::corpus::{normalize, Corpus};
use crate::generation::Generator;
use crate::human_gate::HumanInteraction;
use crate::metrics::METRICS;
use crate::obs;
use crate::orchestration::{
    Collaborators, DriveOutcome, DriveReport, Orchestrator, OrchestratorSettings,
    OrchestratorState, TerminationReason,
};
use crate::registry::{standard_roster, AgentRegistry, RoleSpec};

/// Capacity of each session's turn stream.
const TURN_STREAM_CAPACITY: usize = 256;

/// Where a new session's corpus comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedSelector {
    /// Fetch `count` records about `topic` from a provider.
    Fetch {
        source: SourceKind,
        topic: String,
        count: usize,
    },
    /// Use operator-supplied text as the corpus.
    Text(String),
}

impl SeedSelector {
    fn label(&self) -> String {
        match self {
            SeedSelector::Fetch { source, .. } => source.to_string(),
            SeedSelector::Text(_) => "text".to_string(),
        }
    }
}

/// What a caller learns about a session when it starts or is restored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: SessionId,
    pub source: String,
    pub corpus_chars: usize,
    /// Records left out to respect the corpus ceiling
    pub dropped_records: usize,
    pub truncated: bool,
    /// Role names in rotation order
    pub roles: Vec<String>,
    pub max_rounds: u64,
    pub turns: usize,
    pub state: OrchestratorState,
    pub started_at: DateTime<Utc>,
}

struct SessionHandle {
    orchestrator: Mutex<Orchestrator>,
    close_tx: watch::Sender<bool>,
    turn_tx: broadcast::Sender<Turn>,
}

impl SessionHandle {
    fn is_closing(&self) -> bool {
        *self.close_tx.borrow()
    }
}

/// Creates, routes to and closes sessions.
pub struct SessionManager {
    settings: OrchestratorSettings,
    corpus_ceiling: usize,
    roster: Vec<RoleSpec>,
    ledger: Arc<dyn TranscriptLedger>,
    generator: Arc<dyn Generator>,
    providers: HashMap<SourceKind, Arc<dyn ContentProvider>>,
    sessions: RwLock<HashMap<SessionId, Arc<SessionHandle>>>,
}

impl SessionManager {
    /// Manager with the standard roster and the three configured providers.
    pub fn new(
        config: &ScrivenerConfig,
        ledger: Arc<dyn TranscriptLedger>,
        generator: Arc<dyn Generator>,
    ) -> Self {
        let mut providers: HashMap<SourceKind, Arc<dyn ContentProvider>> = HashMap::new();
        providers.insert(
            SourceKind::Forum,
            Arc::new(ForumProvider::new(config.forum.clone())),
        );
        providers.insert(
            SourceKind::News,
            Arc::new(NewsProvider::new(config.news.clone())),
        );
        providers.insert(
            SourceKind::Local,
            Arc::new(LocalCorpusProvider::new(config.local.clone())),
        );

        Self {
            settings: config.orchestrator_settings(),
            corpus_ceiling: config.session.corpus_ceiling,
            roster: standard_roster(),
            ledger,
            generator,
            providers,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Replace the provider used for `kind`.
    pub fn with_provider(mut self, kind: SourceKind, provider: Arc<dyn ContentProvider>) -> Self {
        self.providers.insert(kind, provider);
        self
    }

    /// Replace the roster new sessions are built from.
    pub fn with_roster(mut self, roster: Vec<RoleSpec>) -> Self {
        self.roster = roster;
        self
    }

    pub fn ledger(&self) -> &Arc<dyn TranscriptLedger> {
        &self.ledger
    }

    /// Build the roster and corpus, persist the session and register it.
    ///
    /// Nothing is persisted if the roster is invalid or the fetch fails.
    pub async fn on_session_start(
        &self,
        selector: SeedSelector,
        human: Arc<dyn HumanInteraction>,
    ) -> SessionResult<SessionSummary> {
        let registry = AgentRegistry::build(self.roster.clone())?;
        let corpus = self.build_corpus(&selector).await?;

        let metadata = SessionMetadata {
            corpus_digest: corpus.digest(),
            corpus_text: corpus.rendered().to_string(),
            roster: serde_json::to_value(registry.specs())?,
            max_rounds: self.settings.max_rounds,
        };
        let session_id = self.ledger.create_session(metadata).await?;

        METRICS.inc_sessions_started();
        obs::emit_session_started(
            session_id.as_str(),
            &selector.label(),
            corpus.char_len(),
            corpus.dropped(),
        );

        let orchestrator = Orchestrator::new(
            session_id.clone(),
            registry,
            Arc::new(corpus),
            self.collaborators(human),
            self.settings.clone(),
        )?;
        let summary = summarize(&orchestrator, selector.label(), Utc::now());
        self.register(orchestrator).await;
        Ok(summary)
    }

    /// Rebuild a persisted session so it can take instructions again.
    ///
    /// A session that is already live is returned as-is.
    pub async fn restore(
        &self,
        session_id: &SessionId,
        human: Arc<dyn HumanInteraction>,
    ) -> SessionResult<SessionSummary> {
        let existing = self.sessions.read().await.get(session_id).cloned();
        if let Some(handle) = existing {
            let orchestrator = handle.orchestrator.lock().await;
            return Ok(summarize(&orchestrator, "restored".to_string(), Utc::now()));
        }

        let record: SessionRecord = self.ledger.get_session(session_id).await?;
        let turns = self.ledger.get_turns(session_id).await?;
        let roster: Vec<RoleSpec> = serde_json::from_value(record.metadata.roster.clone())?;
        let registry = AgentRegistry::build(roster)?;
        let ceiling = self
            .corpus_ceiling
            .max(record.metadata.corpus_text.chars().count());
        let corpus = Corpus::from_text(&record.metadata.corpus_text, ceiling);
        let started_at = record.created_at;

        let orchestrator = Orchestrator::restore(
            record,
            turns,
            registry,
            Arc::new(corpus),
            self.collaborators(human),
            self.settings.clone(),
        )?;
        info!(
            session_id = %session_id,
            turns = orchestrator.transcript().len(),
            state = %orchestrator.state(),
            "session restored"
        );
        let summary = summarize(&orchestrator, "restored".to_string(), started_at);
        self.register(orchestrator).await;
        Ok(summary)
    }

    /// Route an operator instruction to the session.
    ///
    /// Waits behind any drive already running for the same session.
    pub async fn on_instruction(
        &self,
        session_id: &SessionId,
        text: &str,
    ) -> SessionResult<DriveReport> {
        let handle = self.handle(session_id).await?;
        if handle.is_closing() {
            return Err(closed(session_id));
        }

        let mut orchestrator = handle.orchestrator.lock().await;
        if handle.is_closing() {
            orchestrator.close().await;
            return Err(closed(session_id));
        }
        let mut report = orchestrator.handle_instruction(text).await?;
        // A close that landed while the drive held the session.
        if handle.is_closing() && !report.outcome.is_terminated() {
            orchestrator.close().await;
            report.outcome = DriveOutcome::Terminated {
                reason: TerminationReason::Closed,
            };
        }
        Ok(report)
    }

    /// Request the session to stop.
    ///
    /// Observed at the next turn boundary of a running drive, or applied
    /// immediately when the session is idle. Closing twice is harmless.
    pub async fn on_close(&self, session_id: &SessionId) -> SessionResult<()> {
        let handle = self.handle(session_id).await?;
        close_handle(&handle).await;
        Ok(())
    }

    /// Close every live session.
    pub async fn close_all(&self) {
        let handles: Vec<Arc<SessionHandle>> =
            self.sessions.read().await.values().cloned().collect();
        futures::future::join_all(handles.iter().map(|h| close_handle(h))).await;
    }

    /// Ordered turns of a session, read from the ledger.
    pub async fn transcript(&self, session_id: &SessionId) -> SessionResult<Vec<Turn>> {
        Ok(self.ledger.get_turns(session_id).await?)
    }

    /// Turns appended from now on.
    pub async fn subscribe(&self, session_id: &SessionId) -> SessionResult<broadcast::Receiver<Turn>> {
        Ok(self.handle(session_id).await?.turn_tx.subscribe())
    }

    /// Current state; `Running` while a drive holds the session.
    pub async fn state(&self, session_id: &SessionId) -> SessionResult<OrchestratorState> {
        let handle = self.handle(session_id).await?;
        let state = match handle.orchestrator.try_lock() {
            Ok(orchestrator) => orchestrator.state().clone(),
            Err(_) => OrchestratorState::Running,
        };
        Ok(state)
    }

    /// Persisted sessions, newest first.
    pub async fn list_sessions(&self) -> SessionResult<Vec<SessionRecord>> {
        Ok(self.ledger.list_sessions().await?)
    }

    async fn build_corpus(&self, selector: &SeedSelector) -> SessionResult<Corpus> {
        match selector {
            SeedSelector::Text(text) => Ok(Corpus::from_text(text, self.corpus_ceiling)),
            SeedSelector::Fetch {
                source,
                topic,
                count,
            } => {
                let provider = self
                    .providers
                    .get(source)
                    .ok_or(SessionError::UnknownSource(*source))?;
                let records = provider.fetch(topic, *count).await?;
                if records.is_empty() {
                    warn!(source = %source, topic = %topic, "provider returned no records");
                }
                Ok(normalize(records, self.corpus_ceiling))
            }
        }
    }

    fn collaborators(&self, human: Arc<dyn HumanInteraction>) -> Collaborators {
        Collaborators {
            ledger: Arc::clone(&self.ledger),
            generator: Arc::clone(&self.generator),
            human,
        }
    }

    async fn register(&self, orchestrator: Orchestrator) {
        let session_id = orchestrator.session_id().clone();
        let (close_tx, close_rx) = watch::channel(false);
        let (turn_tx, _) = broadcast::channel(TURN_STREAM_CAPACITY);
        let orchestrator = orchestrator
            .with_close_signal(close_rx)
            .with_turn_stream(turn_tx.clone());

        let handle = Arc::new(SessionHandle {
            orchestrator: Mutex::new(orchestrator),
            close_tx,
            turn_tx,
        });
        self.sessions.write().await.insert(session_id, handle);
    }

    async fn handle(&self, session_id: &SessionId) -> SessionResult<Arc<SessionHandle>> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| SessionError::SessionNotFound {
                session_id: session_id.to_string(),
            })
    }
}

async fn close_handle(handle: &SessionHandle) {
    handle.close_tx.send_replace(true);
    // A running drive sees the signal at its next turn boundary.
    if let Ok(mut orchestrator) = handle.orchestrator.try_lock() {
        orchestrator.close().await;
    }
}

fn closed(session_id: &SessionId) -> SessionError {
    SessionError::SessionClosed {
        session_id: session_id.to_string(),
    }
}

fn summarize(orchestrator: &Orchestrator, source: String, started_at: DateTime<Utc>) -> SessionSummary {
    let corpus = orchestrator.corpus();
    SessionSummary {
        session_id: orchestrator.session_id().clone(),
        source,
        corpus_chars: corpus.char_len(),
        dropped_records: corpus.dropped(),
        truncated: corpus.truncated(),
        roles: orchestrator
            .registry()
            .agents()
            .iter()
            .map(|a| a.name.clone())
            .collect(),
        max_rounds: orchestrator.max_rounds(),
        turns: orchestrator.transcript().len(),
        state: orchestrator.state().clone(),
        started_at,
    }
}
