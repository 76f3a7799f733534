//! Conversation orchestration.
//!
//! ```text
//! EMPTY --start--> RUNNING --gate unanswered--> AWAITING_HUMAN --resume--> RUNNING
//!                     |
//!                     +--round limit / exit / fatal generation / close--> TERMINATED
//! ```
//!
//! # Module layout
//!
//! - [`orchestrator`]: `Orchestrator`, `OrchestratorSettings`, `Collaborators`
//! - [`state`]: `OrchestratorState`, `TerminationReason`, `DriveOutcome`, `DriveReport`
//! - [`transcript`]: `Transcript`
//! - [`error`]: `OrchestrationError`, `OrchestrationResult`

pub mod error;
pub mod orchestrator;
pub mod state;
pub mod transcript;

pub use error::{OrchestrationError, OrchestrationResult};
pub use orchestrator::{Collaborators, Orchestrator, OrchestratorSettings, DEFAULT_MAX_ROUNDS};
pub use state::{DriveOutcome, DriveReport, OrchestratorState, TerminationReason};
pub use transcript::Transcript;
