//! Round-driving behaviour of a single session's orchestrator.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{broadcast, watch};

use scrivener_core::fakes::{EchoGenerator, HumanStep, ScriptedGenerator, ScriptedHuman};
use scrivener_core::generation::{GenerationError, GenerationPolicy, Generator};
use scrivener_core::human_gate::{GateChoice, HumanInteraction};
use scrivener_core::orchestration::{
    Collaborators, DriveOutcome, OrchestrationError, Orchestrator, OrchestratorSettings,
    OrchestratorState, TerminationReason,
};
use scrivener_core::registry::roster::{
    EMOTIONAL_STRATEGIST, PROOF_READER, STYLE_SPECIALIST, USER_PROXY, WRITER,
};
use scrivener_core::{standard_roster, AgentRegistry, Corpus};
use transcript_ledger::fakes::MemoryTranscriptLedger;
use transcript_ledger::{
    Recipient, SessionId, SessionMetadata, SessionRecord, SessionStatus, StorageError,
    StorageResult, TranscriptLedger, Turn, TurnKind,
};

const SEED: &str = "Title: Ownership\nAuthor: r/rust\nDescription: N/A\nContent: borrow checker tips";

fn settings(max_rounds: u64) -> OrchestratorSettings {
    OrchestratorSettings {
        max_rounds,
        generation: GenerationPolicy {
            timeout_ms: 1_000,
            max_retries: 2,
            backoff_base_ms: 1,
        },
        ..Default::default()
    }
}

async fn new_session(ledger: &Arc<dyn TranscriptLedger>, max_rounds: u64) -> (SessionId, Arc<Corpus>) {
    let corpus = Corpus::from_text(SEED, 8192);
    let id = ledger
        .create_session(SessionMetadata {
            corpus_digest: corpus.digest(),
            corpus_text: corpus.rendered().to_string(),
            roster: serde_json::to_value(standard_roster()).unwrap(),
            max_rounds,
        })
        .await
        .unwrap();
    (id, Arc::new(corpus))
}

struct Harness {
    ledger: Arc<dyn TranscriptLedger>,
    orchestrator: Orchestrator,
}

async fn harness(
    max_rounds: u64,
    generator: Arc<dyn Generator>,
    human: Arc<dyn HumanInteraction>,
) -> Harness {
    let ledger: Arc<dyn TranscriptLedger> = Arc::new(MemoryTranscriptLedger::new());
    harness_with_ledger(ledger, max_rounds, generator, human).await
}

async fn harness_with_ledger(
    ledger: Arc<dyn TranscriptLedger>,
    max_rounds: u64,
    generator: Arc<dyn Generator>,
    human: Arc<dyn HumanInteraction>,
) -> Harness {
    let (id, corpus) = new_session(&ledger, max_rounds).await;
    let orchestrator = Orchestrator::new(
        id,
        AgentRegistry::build(standard_roster()).unwrap(),
        corpus,
        Collaborators {
            ledger: Arc::clone(&ledger),
            generator,
            human,
        },
        settings(max_rounds),
    )
    .unwrap();
    Harness {
        ledger,
        orchestrator,
    }
}

fn assert_gapless(turns: &[Turn]) {
    for (i, turn) in turns.iter().enumerate() {
        assert_eq!(turn.seq, i as u64, "turn {i} has seq {}", turn.seq);
    }
}

// ---------------------------------------------------------------------------
// Round ceiling
// ---------------------------------------------------------------------------

#[tokio::test]
async fn ceiling_of_three_stops_after_three_turns_beyond_seed() {
    let mut h = harness(3, Arc::new(EchoGenerator::new()), Arc::new(ScriptedHuman::new(vec![]))).await;

    let report = h.orchestrator.handle_instruction("Write about Rust").await.unwrap();

    assert_eq!(
        report.outcome,
        DriveOutcome::Terminated {
            reason: TerminationReason::RoundLimit
        }
    );
    assert_eq!(report.turns_appended, 4);
    assert_eq!(report.last_seq, Some(3));

    let id = h.orchestrator.session_id().clone();
    let turns = h.ledger.get_turns(&id).await.unwrap();
    assert_eq!(turns.len(), 4);
    assert_gapless(&turns);
    let speakers: Vec<&str> = turns.iter().map(|t| t.speaker.as_str()).collect();
    assert_eq!(speakers, vec![USER_PROXY, PROOF_READER, WRITER, STYLE_SPECIALIST]);

    let record = h.ledger.get_session(&id).await.unwrap();
    assert_eq!(record.status, SessionStatus::Terminated);
    assert_eq!(record.termination.unwrap()["reason"], "ROUND_LIMIT");
}

#[tokio::test]
async fn instruction_after_termination_is_rejected() {
    let mut h = harness(1, Arc::new(EchoGenerator::new()), Arc::new(ScriptedHuman::new(vec![]))).await;
    h.orchestrator.handle_instruction("go").await.unwrap();

    let err = h.orchestrator.handle_instruction("again").await.unwrap_err();
    assert!(matches!(err, OrchestrationError::SessionClosed { .. }));
    assert_eq!(h.orchestrator.transcript().len(), 2);
}

// ---------------------------------------------------------------------------
// Seed turn and recipients
// ---------------------------------------------------------------------------

#[tokio::test]
async fn seed_turn_is_a_broadcast_brief_from_the_human_proxy() {
    let mut h = harness(2, Arc::new(EchoGenerator::new()), Arc::new(ScriptedHuman::new(vec![]))).await;
    h.orchestrator.handle_instruction("local LLMs").await.unwrap();

    let turns = h.orchestrator.transcript().turns();
    let seed = &turns[0];
    assert_eq!(seed.speaker, USER_PROXY);
    assert_eq!(seed.recipient, Recipient::Broadcast);
    assert_eq!(seed.kind, TurnKind::Instruction);
    assert!(seed.content.contains("Use this content as background"));
    assert!(seed.content.contains("borrow checker tips"));
    assert!(seed.content.contains("The topic of the article will be about: local LLMs"));

    assert_eq!(turns[1].recipient, Recipient::Agent(WRITER.to_string()));
    assert_eq!(turns[1].kind, TurnKind::Reply);
}

// ---------------------------------------------------------------------------
// Human gate integration
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unanswered_gate_suspends_on_the_human_slot() {
    let human = Arc::new(ScriptedHuman::new(vec![HumanStep::Silent]));
    let mut h = harness(50, Arc::new(EchoGenerator::new()), human.clone()).await;

    let report = h.orchestrator.handle_instruction("topic").await.unwrap();

    assert_eq!(report.outcome, DriveOutcome::Suspended);
    assert_eq!(report.turns_appended, 6);
    assert_eq!(h.orchestrator.state(), &OrchestratorState::AwaitingHuman);
    assert_eq!(h.orchestrator.next_speaker().name, USER_PROXY);
    assert_eq!(h.orchestrator.rounds(), 5);
    assert_eq!(h.orchestrator.transcript().last().unwrap().speaker, EMOTIONAL_STRATEGIST);
    assert_eq!(human.prompts().await.len(), 1);
}

#[tokio::test]
async fn resume_then_continue_yields_empty_turn_and_normal_rotation() {
    let human = Arc::new(ScriptedHuman::new(vec![
        HumanStep::Silent,
        HumanStep::Choose(GateChoice::Continue),
    ]));
    let mut h = harness(50, Arc::new(EchoGenerator::new()), human).await;
    h.orchestrator.handle_instruction("topic").await.unwrap();

    let report = h.orchestrator.resume("Make it shorter").await.unwrap();
    assert_eq!(report.outcome, DriveOutcome::Suspended);

    let turns = h.orchestrator.transcript().turns();
    assert_gapless(turns);

    let instruction = &turns[6];
    assert_eq!(instruction.kind, TurnKind::Instruction);
    assert_eq!(instruction.content, "Make it shorter");
    assert_eq!(instruction.recipient, Recipient::Broadcast);

    let human_turn = &turns[7];
    assert_eq!(human_turn.speaker, USER_PROXY);
    assert_eq!(human_turn.kind, TurnKind::HumanReply);
    assert_eq!(human_turn.content, "");
    assert_eq!(human_turn.recipient, Recipient::Agent(PROOF_READER.to_string()));

    assert_eq!(turns[8].speaker, PROOF_READER);
    assert_eq!(turns[9].speaker, WRITER);
    // Five role turns, one human turn, five role turns; instructions are not rounds.
    assert_eq!(h.orchestrator.rounds(), 11);
    assert_eq!(h.orchestrator.next_speaker().name, USER_PROXY);
}

#[tokio::test]
async fn seqs_stay_gapless_across_many_resumes() {
    let mut h = harness(50, Arc::new(EchoGenerator::new()), Arc::new(ScriptedHuman::new(vec![]))).await;
    h.orchestrator.handle_instruction("topic").await.unwrap();
    for i in 0..4 {
        let report = h.orchestrator.resume(&format!("note {i}")).await.unwrap();
        assert_eq!(report.outcome, DriveOutcome::Suspended);
        // Only the instruction turn: the gate times out straight away.
        assert_eq!(report.turns_appended, 1);
    }

    let id = h.orchestrator.session_id().clone();
    let turns = h.ledger.get_turns(&id).await.unwrap();
    assert_eq!(turns.len(), 10);
    assert_gapless(&turns);
    assert_eq!(turns, h.orchestrator.transcript().snapshot());
}

#[tokio::test]
async fn exit_choice_terminates_with_user_exit() {
    let human = Arc::new(ScriptedHuman::new(vec![HumanStep::Choose(GateChoice::Exit)]));
    let mut h = harness(50, Arc::new(EchoGenerator::new()), human).await;

    let report = h.orchestrator.handle_instruction("topic").await.unwrap();

    assert_eq!(
        report.outcome,
        DriveOutcome::Terminated {
            reason: TerminationReason::UserExit
        }
    );
    let last = h.orchestrator.transcript().last().unwrap();
    assert_eq!(last.seq, 6);
    assert_eq!(last.content, "exit");
}

#[tokio::test]
async fn typed_exit_also_ends_the_session() {
    let human = Arc::new(ScriptedHuman::new(vec![
        HumanStep::Choose(GateChoice::Feedback),
        HumanStep::Type(" exit ".to_string()),
    ]));
    let mut h = harness(50, Arc::new(EchoGenerator::new()), human).await;

    let report = h.orchestrator.handle_instruction("topic").await.unwrap();
    assert_eq!(
        report.outcome,
        DriveOutcome::Terminated {
            reason: TerminationReason::UserExit
        }
    );
}

#[tokio::test]
async fn feedback_text_becomes_the_human_turn() {
    let human = Arc::new(ScriptedHuman::new(vec![
        HumanStep::Choose(GateChoice::Feedback),
        HumanStep::Type("  Open with a question.  ".to_string()),
    ]));
    let mut h = harness(8, Arc::new(EchoGenerator::new()), human).await;

    h.orchestrator.handle_instruction("topic").await.unwrap();

    let turns = h.orchestrator.transcript().turns();
    assert_eq!(turns[6].content, "Open with a question.");
    assert_eq!(turns[6].kind, TurnKind::HumanReply);
    assert_eq!(turns[7].speaker, PROOF_READER);
}

#[tokio::test]
async fn unavailable_human_degrades_to_empty_reply() {
    let human = Arc::new(ScriptedHuman::new(vec![HumanStep::Disconnect]));
    let mut h = harness(7, Arc::new(EchoGenerator::new()), human).await;

    let report = h.orchestrator.handle_instruction("topic").await.unwrap();

    assert_eq!(
        report.outcome,
        DriveOutcome::Terminated {
            reason: TerminationReason::RoundLimit
        }
    );
    let turns = h.orchestrator.transcript().turns();
    assert_eq!(turns.len(), 8);
    assert_eq!(turns[6].speaker, USER_PROXY);
    assert_eq!(turns[6].content, "");
    assert_eq!(turns[7].speaker, PROOF_READER);
}

// ---------------------------------------------------------------------------
// Generation failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fatal_generation_error_terminates_the_session() {
    let mut h = harness(
        50,
        Arc::new(ScriptedGenerator::fatal("HTTP 401: invalid key")),
        Arc::new(ScriptedHuman::new(vec![])),
    )
    .await;

    let report = h.orchestrator.handle_instruction("topic").await.unwrap();

    match report.outcome {
        DriveOutcome::Terminated {
            reason: TerminationReason::GenerationFailure { ref detail },
        } => assert!(detail.contains("401")),
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(report.turns_appended, 1);
    let id = h.orchestrator.session_id().clone();
    let record = h.ledger.get_session(&id).await.unwrap();
    assert_eq!(record.termination.unwrap()["reason"], "GENERATION_FAILURE");
}

#[tokio::test]
async fn transient_generation_error_is_retried() {
    let generator = Arc::new(ScriptedGenerator::new(vec![
        Err(GenerationError::Transient("HTTP 503".into())),
        Ok("first draft".to_string()),
    ]));
    let mut h = harness(1, generator.clone(), Arc::new(ScriptedHuman::new(vec![]))).await;

    let report = h.orchestrator.handle_instruction("topic").await.unwrap();

    assert_eq!(
        report.outcome,
        DriveOutcome::Terminated {
            reason: TerminationReason::RoundLimit
        }
    );
    assert_eq!(h.orchestrator.transcript().turns()[1].content, "first draft");
    assert_eq!(generator.calls().await, 2);
}

#[tokio::test]
async fn exhausted_retries_escalate_to_generation_failure() {
    let generator = Arc::new(ScriptedGenerator::new(vec![
        Err(GenerationError::Transient("HTTP 429".into())),
        Err(GenerationError::Transient("HTTP 429".into())),
        Err(GenerationError::Transient("HTTP 429".into())),
    ]));
    let mut h = harness(50, generator.clone(), Arc::new(ScriptedHuman::new(vec![]))).await;

    let report = h.orchestrator.handle_instruction("topic").await.unwrap();

    match report.outcome {
        DriveOutcome::Terminated {
            reason: TerminationReason::GenerationFailure { ref detail },
        } => assert!(detail.contains("gave up after 3")),
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(generator.calls().await, 3);
}

// ---------------------------------------------------------------------------
// Close, restore, streaming
// ---------------------------------------------------------------------------

#[tokio::test]
async fn close_signal_is_observed_at_the_next_turn_boundary() {
    let (tx, rx) = watch::channel(false);
    let h = harness(50, Arc::new(EchoGenerator::new()), Arc::new(ScriptedHuman::new(vec![]))).await;
    let mut orchestrator = h.orchestrator.with_close_signal(rx);
    tx.send(true).unwrap();

    let report = orchestrator.handle_instruction("topic").await.unwrap();

    assert_eq!(
        report.outcome,
        DriveOutcome::Terminated {
            reason: TerminationReason::Closed
        }
    );
    assert_eq!(report.turns_appended, 1);
}

#[tokio::test]
async fn close_before_start_rejects_later_instructions() {
    let mut h = harness(50, Arc::new(EchoGenerator::new()), Arc::new(ScriptedHuman::new(vec![]))).await;
    h.orchestrator.close().await;
    h.orchestrator.close().await;

    assert!(h.orchestrator.state().is_terminated());
    let err = h.orchestrator.handle_instruction("topic").await.unwrap_err();
    assert!(matches!(err, OrchestrationError::SessionClosed { .. }));
}

#[tokio::test]
async fn restore_resumes_where_the_rotation_stopped() {
    let ledger: Arc<dyn TranscriptLedger> = Arc::new(MemoryTranscriptLedger::new());
    let mut h = harness_with_ledger(
        Arc::clone(&ledger),
        50,
        Arc::new(EchoGenerator::new()),
        Arc::new(ScriptedHuman::new(vec![])),
    )
    .await;
    h.orchestrator.handle_instruction("topic").await.unwrap();
    let id = h.orchestrator.session_id().clone();
    drop(h);

    let record = ledger.get_session(&id).await.unwrap();
    let turns = ledger.get_turns(&id).await.unwrap();
    let corpus = Arc::new(Corpus::from_text(&record.metadata.corpus_text, 8192));
    let human = Arc::new(ScriptedHuman::new(vec![HumanStep::Choose(GateChoice::Continue)]));
    let mut restored = Orchestrator::restore(
        record,
        turns,
        AgentRegistry::build(standard_roster()).unwrap(),
        corpus,
        Collaborators {
            ledger: Arc::clone(&ledger),
            generator: Arc::new(EchoGenerator::new()),
            human,
        },
        settings(50),
    )
    .unwrap();

    assert_eq!(restored.state(), &OrchestratorState::AwaitingHuman);
    assert_eq!(restored.rounds(), 5);
    assert_eq!(restored.next_speaker().name, USER_PROXY);

    restored.handle_instruction("carry on").await.unwrap();
    let turns = ledger.get_turns(&id).await.unwrap();
    assert_gapless(&turns);
    assert_eq!(turns[6].content, "carry on");
    assert_eq!(turns[7].content, "");
    assert_eq!(turns[8].speaker, PROOF_READER);
}

#[tokio::test]
async fn restore_keeps_terminated_sessions_closed() {
    let mut h = harness(2, Arc::new(EchoGenerator::new()), Arc::new(ScriptedHuman::new(vec![]))).await;
    h.orchestrator.handle_instruction("topic").await.unwrap();
    let id = h.orchestrator.session_id().clone();

    let record = h.ledger.get_session(&id).await.unwrap();
    let turns = h.ledger.get_turns(&id).await.unwrap();
    let corpus = Arc::new(Corpus::from_text(&record.metadata.corpus_text, 8192));
    let restored = Orchestrator::restore(
        record,
        turns,
        AgentRegistry::build(standard_roster()).unwrap(),
        corpus,
        Collaborators {
            ledger: Arc::clone(&h.ledger),
            generator: Arc::new(EchoGenerator::new()),
            human: Arc::new(ScriptedHuman::new(vec![])),
        },
        settings(50),
    )
    .unwrap();

    assert_eq!(
        restored.state(),
        &OrchestratorState::Terminated {
            reason: TerminationReason::RoundLimit
        }
    );
    assert_eq!(restored.max_rounds(), 2);
}

#[tokio::test]
async fn every_turn_is_published_on_the_stream() {
    let (tx, mut rx) = broadcast::channel(64);
    let h = harness(4, Arc::new(EchoGenerator::new()), Arc::new(ScriptedHuman::new(vec![]))).await;
    let mut orchestrator = h.orchestrator.with_turn_stream(tx);

    orchestrator.handle_instruction("topic").await.unwrap();

    let mut seqs = Vec::new();
    while let Ok(turn) = rx.try_recv() {
        seqs.push(turn.seq);
    }
    assert_eq!(seqs, vec![0, 1, 2, 3, 4]);
}

// ---------------------------------------------------------------------------
// Storage failure
// ---------------------------------------------------------------------------

/// Ledger that refuses appends from a given seq on.
struct RefusingLedger {
    inner: MemoryTranscriptLedger,
    refuse_from: u64,
}

#[async_trait]
impl TranscriptLedger for RefusingLedger {
    async fn create_session(&self, metadata: SessionMetadata) -> StorageResult<SessionId> {
        self.inner.create_session(metadata).await
    }

    async fn append_turn(&self, session_id: &SessionId, turn: Turn) -> StorageResult<()> {
        if turn.seq >= self.refuse_from {
            return Err(StorageError::Backend("disk full".to_string()));
        }
        self.inner.append_turn(session_id, turn).await
    }

    async fn mark_terminated(
        &self,
        session_id: &SessionId,
        reason: serde_json::Value,
    ) -> StorageResult<()> {
        self.inner.mark_terminated(session_id, reason).await
    }

    async fn get_session(&self, session_id: &SessionId) -> StorageResult<SessionRecord> {
        self.inner.get_session(session_id).await
    }

    async fn get_turns(&self, session_id: &SessionId) -> StorageResult<Vec<Turn>> {
        self.inner.get_turns(session_id).await
    }

    async fn list_sessions(&self) -> StorageResult<Vec<SessionRecord>> {
        self.inner.list_sessions().await
    }
}

#[tokio::test]
async fn ledger_failure_terminates_with_storage_failure() {
    let ledger: Arc<dyn TranscriptLedger> = Arc::new(RefusingLedger {
        inner: MemoryTranscriptLedger::new(),
        refuse_from: 2,
    });
    let mut h = harness_with_ledger(
        ledger,
        50,
        Arc::new(EchoGenerator::new()),
        Arc::new(ScriptedHuman::new(vec![])),
    )
    .await;

    let report = h.orchestrator.handle_instruction("topic").await.unwrap();

    match report.outcome {
        DriveOutcome::Terminated {
            reason: TerminationReason::StorageFailure { ref detail },
        } => assert!(detail.contains("disk full")),
        other => panic!("unexpected outcome {other:?}"),
    }
    // The in-memory transcript never runs ahead of the ledger.
    assert_eq!(h.orchestrator.transcript().len(), 2);
}
