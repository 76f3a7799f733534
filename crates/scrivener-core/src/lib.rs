//! Scrivener Core Library
//!
//! Supervised multi-agent article writing: fetch raw material, flatten it into
//! a bounded corpus, then let a fixed roster of writing roles take turns on it
//! while a human operator can step in at their slot of the rotation.
//!
//! ## Key Components
//!
//! - [`corpus`]: the corpus normalizer
//! - [`registry`]: the session roster
//! - [`human_gate`]: the operator's gate into the rotation
//! - [`generation`]: the reply capability, retry controls and the OpenAI adapter
//! - [`orchestration`]: the per-session conversation state machine
//! - [`session`]: the entry point that creates, instructs and closes sessions

pub mod config;
pub mod corpus;
pub mod fakes;
pub mod generation;
pub mod human_gate;
pub mod metrics;
pub mod obs;
pub mod orchestration;
pub mod prompt;
pub mod registry;
pub mod session;
pub mod telemetry;

pub use config::{ConfigError, ConfigResult, ScrivenerConfig, SessionConfig};
pub use corpus::{normalize, render_record, Corpus, DEFAULT_CORPUS_CEILING};
pub use generation::{
    generate_with_retry, GenerationError, GenerationPolicy, GenerationRequest, GenerationResult,
    Generator, OpenAiConfig, OpenAiGenerator,
};
pub use human_gate::{
    GateChoice, GateConfig, GateError, GateOutcome, GateState, HumanGate, HumanInteraction,
    InteractionError,
};
pub use orchestration::{
    Collaborators, DriveOutcome, DriveReport, OrchestrationError, Orchestrator,
    OrchestratorSettings, OrchestratorState, TerminationReason, Transcript,
};
pub use prompt::BriefConfig;
pub use registry::{standard_roster, Agent, AgentRegistry, RegistryError, RoleKind, RoleSpec};
pub use session::{SeedSelector, SessionError, SessionManager, SessionResult, SessionSummary};

pub use content_sources::{ContentProvider, ContentRecord, SourceKind};
pub use transcript_ledger::{
    Recipient, SessionId, SessionRecord, SurrealTranscriptLedger, TranscriptLedger, Turn, TurnKind,
};
