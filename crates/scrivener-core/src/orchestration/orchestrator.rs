//! Per-session conversation orchestrator.
//!
//! The orchestrator is the only writer of its session's transcript. Each
//! instruction either starts the conversation (empty transcript) or resumes
//! it, then drives rounds: the role at the rotation cursor speaks, the turn is
//! written through to the ledger, and termination is checked. At the
//! human-proxy slot the human gate supplies the turn instead of a generator.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};
use tracing::{debug, instrument};

use transcript_ledger::{Recipient, SessionId, SessionRecord, TranscriptLedger, Turn, TurnKind};

use super::error::{OrchestrationError, OrchestrationResult};
use super::state::{DriveOutcome, DriveReport, OrchestratorState, TerminationReason};
use super::transcript::Transcript;
use crate::corpus::Corpus;
use crate::generation::{generate_with_retry, GenerationPolicy, GenerationRequest, Generator};
use crate::human_gate::{GateConfig, GateOutcome, HumanGate, HumanInteraction, EXIT_TOKEN, FEEDBACK_PROMPT};
use crate::metrics::METRICS;
use crate::obs;
use crate::prompt::BriefConfig;
use crate::registry::{Agent, AgentRegistry};

/// Default round ceiling.
pub const DEFAULT_MAX_ROUNDS: u64 = 50;

/// Tunables for one session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OrchestratorSettings {
    /// Role and human turns allowed before the session ends with `ROUND_LIMIT`.
    pub max_rounds: u64,
    pub generation: GenerationPolicy,
    pub gate: GateConfig,
    pub brief: BriefConfig,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            max_rounds: DEFAULT_MAX_ROUNDS,
            generation: GenerationPolicy::default(),
            gate: GateConfig::default(),
            brief: BriefConfig::default(),
        }
    }
}

/// External capabilities a session talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub ledger: Arc<dyn TranscriptLedger>,
    pub generator: Arc<dyn Generator>,
    pub human: Arc<dyn HumanInteraction>,
}

pub struct Orchestrator {
    session_id: SessionId,
    registry: AgentRegistry,
    corpus: Arc<Corpus>,
    transcript: Transcript,
    gate: HumanGate,
    collaborators: Collaborators,
    settings: OrchestratorSettings,
    state: OrchestratorState,
    rounds: u64,
    cursor: usize,
    close_rx: Option<watch::Receiver<bool>>,
    turn_tx: Option<broadcast::Sender<Turn>>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("session_id", &self.session_id)
            .field("state", &self.state)
            .field("rounds", &self.rounds)
            .field("cursor", &self.cursor)
            .field("turns", &self.transcript.len())
            .finish()
    }
}

impl Orchestrator {
    /// Fresh orchestrator for a session already created in the ledger.
    pub fn new(
        session_id: SessionId,
        registry: AgentRegistry,
        corpus: Arc<Corpus>,
        collaborators: Collaborators,
        settings: OrchestratorSettings,
    ) -> OrchestrationResult<Self> {
        let gate = HumanGate::new(settings.gate.clone())?;
        let cursor = registry.next_slot(registry.human_proxy_index());
        Ok(Self {
            session_id,
            registry,
            corpus,
            transcript: Transcript::new(),
            gate,
            collaborators,
            settings,
            state: OrchestratorState::Empty,
            rounds: 0,
            cursor,
            close_rx: None,
            turn_tx: None,
        })
    }

    /// Rebuild an orchestrator from a persisted session and its turns.
    ///
    /// The round count is the number of non-instruction turns and the cursor
    /// sits after the last role that spoke. The session's own round ceiling
    /// overrides the one in `settings`.
    pub fn restore(
        record: SessionRecord,
        turns: Vec<Turn>,
        registry: AgentRegistry,
        corpus: Arc<Corpus>,
        collaborators: Collaborators,
        mut settings: OrchestratorSettings,
    ) -> OrchestrationResult<Self> {
        let transcript = Transcript::from_turns(turns)?;
        settings.max_rounds = record.metadata.max_rounds;

        let cursor = match transcript.last_round() {
            Some(turn) => {
                let position = registry.position(&turn.speaker).ok_or_else(|| {
                    OrchestrationError::CorruptTranscript {
                        detail: format!("speaker {} is not in the roster", turn.speaker),
                    }
                })?;
                registry.next_slot(position)
            }
            None => registry.next_slot(registry.human_proxy_index()),
        };

        let state = if let Some(value) = record.termination.clone() {
            let reason = serde_json::from_value(value).unwrap_or(TerminationReason::Closed);
            OrchestratorState::Terminated { reason }
        } else if record.status == transcript_ledger::SessionStatus::Terminated {
            OrchestratorState::Terminated {
                reason: TerminationReason::Closed,
            }
        } else if transcript.is_empty() {
            OrchestratorState::Empty
        } else {
            OrchestratorState::AwaitingHuman
        };

        let gate = HumanGate::new(settings.gate.clone())?;
        Ok(Self {
            session_id: record.session_id,
            registry,
            corpus,
            rounds: transcript.rounds(),
            transcript,
            gate,
            collaborators,
            settings,
            state,
            cursor,
            close_rx: None,
            turn_tx: None,
        })
    }

    /// Observe `rx` at every turn boundary; `true` ends the session.
    pub fn with_close_signal(mut self, rx: watch::Receiver<bool>) -> Self {
        self.close_rx = Some(rx);
        self
    }

    /// Publish every appended turn on `tx`.
    pub fn with_turn_stream(mut self, tx: broadcast::Sender<Turn>) -> Self {
        self.turn_tx = Some(tx);
        self
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn state(&self) -> &OrchestratorState {
        &self.state
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    /// Rounds counted so far against the ceiling.
    pub fn rounds(&self) -> u64 {
        self.rounds
    }

    pub fn max_rounds(&self) -> u64 {
        self.settings.max_rounds
    }

    /// Role that speaks next.
    pub fn next_speaker(&self) -> &Agent {
        self.registry.slot(self.cursor)
    }

    /// Route an operator instruction to `start` or `resume`.
    pub async fn handle_instruction(&mut self, text: &str) -> OrchestrationResult<DriveReport> {
        match self.state {
            OrchestratorState::Empty => {
                let corpus = Arc::clone(&self.corpus);
                self.start(corpus.rendered(), text).await
            }
            OrchestratorState::AwaitingHuman => self.resume(text).await,
            OrchestratorState::Terminated { .. } => Err(self.closed_error()),
            OrchestratorState::Running => Err(OrchestrationError::InvalidState {
                operation: "instruct",
                actual: self.state.as_str(),
            }),
        }
    }

    /// Append the seed turn (brief, corpus and instruction) and drive rounds.
    pub async fn start(
        &mut self,
        seed_text: &str,
        instruction: &str,
    ) -> OrchestrationResult<DriveReport> {
        if self.state != OrchestratorState::Empty {
            return Err(self.invalid_state("start"));
        }
        let content = self.settings.brief.seed_message(seed_text, instruction);
        self.instruct(content).await
    }

    /// Append an instruction-only turn and continue the rotation where it stopped.
    pub async fn resume(&mut self, instruction: &str) -> OrchestrationResult<DriveReport> {
        match self.state {
            OrchestratorState::AwaitingHuman => self.instruct(instruction.to_string()).await,
            OrchestratorState::Terminated { .. } => Err(self.closed_error()),
            _ => Err(self.invalid_state("resume")),
        }
    }

    /// Terminate with `CLOSED` unless already terminated.
    pub async fn close(&mut self) {
        if !self.state.is_terminated() {
            self.terminate(TerminationReason::Closed).await;
        }
    }

    async fn instruct(&mut self, content: String) -> OrchestrationResult<DriveReport> {
        let first_seq = self.transcript.next_seq();
        let speaker = self.registry.human_proxy().name.clone();
        let outcome = match self
            .append(speaker, Recipient::Broadcast, TurnKind::Instruction, content)
            .await
        {
            Ok(()) => self.drive().await,
            Err(e) => {
                self.terminate(TerminationReason::StorageFailure {
                    detail: e.to_string(),
                })
                .await
            }
        };

        let report = DriveReport {
            outcome,
            turns_appended: self.transcript.next_seq() - first_seq,
            last_seq: self.transcript.last().map(|t| t.seq),
        };
        obs::emit_drive_finished(
            self.session_id.as_str(),
            report.outcome.as_str(),
            report.turns_appended,
        );
        Ok(report)
    }

    #[instrument(skip_all, fields(session_id = %self.session_id))]
    async fn drive(&mut self) -> DriveOutcome {
        self.state = OrchestratorState::Running;
        loop {
            if self.close_requested() {
                return self.terminate(TerminationReason::Closed).await;
            }
            if self.rounds >= self.settings.max_rounds {
                return self.terminate(TerminationReason::RoundLimit).await;
            }

            let role = self.registry.slot(self.cursor).clone();
            let next = self.registry.next_slot(self.cursor);
            debug!(role = %role.name, rounds = self.rounds, "turn");

            let (kind, content) = if role.is_human_proxy() {
                match self.ask_human().await {
                    Some(text) => (TurnKind::HumanReply, text),
                    None if self.close_requested() => {
                        return self.terminate(TerminationReason::Closed).await;
                    }
                    None => {
                        self.state = OrchestratorState::AwaitingHuman;
                        return DriveOutcome::Suspended;
                    }
                }
            } else {
                match self.generate_reply(&role).await {
                    Ok(text) => (TurnKind::Reply, text),
                    Err(e) => {
                        return self
                            .terminate(TerminationReason::GenerationFailure {
                                detail: e.to_string(),
                            })
                            .await
                    }
                }
            };

            let is_exit = kind == TurnKind::HumanReply && content == EXIT_TOKEN;
            let recipient = Recipient::Agent(self.registry.slot(next).name.clone());
            if let Err(e) = self.append(role.name, recipient, kind, content).await {
                return self
                    .terminate(TerminationReason::StorageFailure {
                        detail: e.to_string(),
                    })
                    .await;
            }
            self.cursor = next;
            self.rounds += 1;

            if is_exit {
                return self.terminate(TerminationReason::UserExit).await;
            }
            if self.rounds >= self.settings.max_rounds {
                return self.terminate(TerminationReason::RoundLimit).await;
            }
        }
    }

    /// `None` when the operator let the choice time out.
    async fn ask_human(&mut self) -> Option<String> {
        match self
            .gate
            .resolve(FEEDBACK_PROMPT, self.collaborators.human.as_ref())
            .await
        {
            Ok(GateOutcome::Resolved(text)) => Some(text),
            Ok(GateOutcome::Unanswered) => None,
            Err(e) => {
                obs::emit_gate_degraded(self.session_id.as_str(), &e);
                Some(String::new())
            }
        }
    }

    async fn generate_reply(&self, role: &Agent) -> crate::generation::GenerationResult<String> {
        let request = GenerationRequest {
            session_id: &self.session_id,
            role,
            transcript: self.transcript.turns(),
            corpus: &self.corpus,
        };
        let generator = &self.collaborators.generator;
        generate_with_retry(&self.settings.generation, &role.name, || {
            generator.generate(request)
        })
        .await
    }

    /// Write through to the ledger, then expose the turn.
    async fn append(
        &mut self,
        speaker: String,
        recipient: Recipient,
        kind: TurnKind,
        content: String,
    ) -> OrchestrationResult<()> {
        let turn = Turn::new(self.transcript.next_seq(), speaker, recipient, kind, content);
        self.collaborators
            .ledger
            .append_turn(&self.session_id, turn.clone())
            .await?;

        METRICS.inc_turns_appended();
        obs::emit_turn_appended(self.session_id.as_str(), turn.seq, &turn.speaker, turn.kind.as_str());
        if let Some(tx) = &self.turn_tx {
            // No subscribers is fine.
            let _ = tx.send(turn.clone());
        }
        self.transcript.push(turn);
        Ok(())
    }

    async fn terminate(&mut self, reason: TerminationReason) -> DriveOutcome {
        let value = serde_json::to_value(&reason).unwrap_or(serde_json::Value::Null);
        if let Err(e) = self
            .collaborators
            .ledger
            .mark_terminated(&self.session_id, value)
            .await
        {
            obs::emit_storage_error(self.session_id.as_str(), &e);
        }
        obs::emit_session_terminated(self.session_id.as_str(), reason.code());
        self.state = OrchestratorState::Terminated {
            reason: reason.clone(),
        };
        DriveOutcome::Terminated { reason }
    }

    fn close_requested(&self) -> bool {
        self.close_rx.as_ref().is_some_and(|rx| *rx.borrow())
    }

    fn closed_error(&self) -> OrchestrationError {
        OrchestrationError::SessionClosed {
            session_id: self.session_id.to_string(),
        }
    }

    fn invalid_state(&self, operation: &'static str) -> OrchestrationError {
        OrchestrationError::InvalidState {
            operation,
            actual: self.state.as_str(),
        }
    }
}
