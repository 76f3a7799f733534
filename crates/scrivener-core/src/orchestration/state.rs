//! Orchestrator lifecycle states and drive results.

use serde::{Deserialize, Serialize};

/// Why a session stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TerminationReason {
    /// The configured round ceiling was reached.
    RoundLimit,
    /// The operator chose to exit.
    UserExit,
    /// A generation call failed fatally or exhausted its retries.
    GenerationFailure { detail: String },
    /// An explicit close request was observed.
    Closed,
    /// The transcript ledger rejected a write.
    StorageFailure { detail: String },
}

impl TerminationReason {
    pub fn code(&self) -> &'static str {
        match self {
            TerminationReason::RoundLimit => "ROUND_LIMIT",
            TerminationReason::UserExit => "USER_EXIT",
            TerminationReason::GenerationFailure { .. } => "GENERATION_FAILURE",
            TerminationReason::Closed => "CLOSED",
            TerminationReason::StorageFailure { .. } => "STORAGE_FAILURE",
        }
    }

    /// Operator-facing explanation.
    pub fn message(&self) -> String {
        match self {
            TerminationReason::RoundLimit => {
                "The conversation reached its round limit.".to_string()
            }
            TerminationReason::UserExit => "The conversation was ended at your request.".to_string(),
            TerminationReason::GenerationFailure { detail } => {
                format!("A writing agent could not produce a reply ({detail}).")
            }
            TerminationReason::Closed => "The session was closed.".to_string(),
            TerminationReason::StorageFailure { detail } => {
                format!("The transcript could not be saved ({detail}).")
            }
        }
    }
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Per-session orchestrator state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrchestratorState {
    /// No turns yet; the next instruction starts the conversation.
    Empty,
    /// A round-drive is in progress.
    Running,
    /// The drive suspended at the human-proxy slot; the next instruction resumes.
    AwaitingHuman,
    Terminated { reason: TerminationReason },
}

impl OrchestratorState {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrchestratorState::Empty => "EMPTY",
            OrchestratorState::Running => "RUNNING",
            OrchestratorState::AwaitingHuman => "AWAITING_HUMAN",
            OrchestratorState::Terminated { .. } => "TERMINATED",
        }
    }

    pub fn is_terminated(&self) -> bool {
        matches!(self, OrchestratorState::Terminated { .. })
    }
}

impl std::fmt::Display for OrchestratorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a round-drive ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DriveOutcome {
    /// Waiting for the next operator instruction.
    Suspended,
    Terminated { reason: TerminationReason },
}

impl DriveOutcome {
    pub fn is_terminated(&self) -> bool {
        matches!(self, DriveOutcome::Terminated { .. })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DriveOutcome::Suspended => "suspended",
            DriveOutcome::Terminated { .. } => "terminated",
        }
    }
}

/// Summary of one instruction's effect on the transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveReport {
    pub outcome: DriveOutcome,
    /// Turns appended by this instruction, including its instruction turn.
    pub turns_appended: u64,
    /// Seq of the last turn in the transcript, if any.
    pub last_seq: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_serializes_with_tag() {
        let json = serde_json::to_value(TerminationReason::GenerationFailure {
            detail: "HTTP 401".into(),
        })
        .unwrap();
        assert_eq!(json["reason"], "GENERATION_FAILURE");
        assert_eq!(json["detail"], "HTTP 401");

        let back: TerminationReason = serde_json::from_value(json).unwrap();
        assert_eq!(back.code(), "GENERATION_FAILURE");
    }

    #[test]
    fn test_messages_are_human_readable() {
        assert!(TerminationReason::RoundLimit.message().contains("round limit"));
        assert!(TerminationReason::GenerationFailure {
            detail: "gave up".into()
        }
        .message()
        .contains("gave up"));
    }

    #[test]
    fn test_state_names() {
        assert_eq!(OrchestratorState::AwaitingHuman.as_str(), "AWAITING_HUMAN");
        assert!(OrchestratorState::Terminated {
            reason: TerminationReason::Closed
        }
        .is_terminated());
        assert!(!OrchestratorState::Empty.is_terminated());
    }
}
