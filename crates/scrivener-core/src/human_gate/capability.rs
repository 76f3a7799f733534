//! Human interaction capability: the seam to whatever presents prompts to the operator.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The bounded action set offered at a feedback request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateChoice {
    Continue,
    Feedback,
    Exit,
}

impl GateChoice {
    /// All choices in presentation order.
    pub const ALL: [GateChoice; 3] = [GateChoice::Continue, GateChoice::Feedback, GateChoice::Exit];

    pub fn value(&self) -> &'static str {
        match self {
            GateChoice::Continue => "continue",
            GateChoice::Feedback => "feedback",
            GateChoice::Exit => "exit",
        }
    }

    /// Operator-facing label.
    pub fn label(&self) -> &'static str {
        match self {
            GateChoice::Continue => "✅ Continue",
            GateChoice::Feedback => "💬 Provide feedback",
            GateChoice::Exit => "🔚 Exit Conversation",
        }
    }
}

impl std::fmt::Display for GateChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value())
    }
}

impl std::str::FromStr for GateChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "continue" | "c" | "1" => Ok(GateChoice::Continue),
            "feedback" | "f" | "2" => Ok(GateChoice::Feedback),
            "exit" | "e" | "q" | "3" => Ok(GateChoice::Exit),
            other => Err(format!("unknown choice: {other}")),
        }
    }
}

/// The presentation layer went away while the gate was waiting.
#[derive(Debug, thiserror::Error)]
#[error("human interaction unavailable: {0}")]
pub struct InteractionError(pub String);

/// Capability that presents prompts to the human operator.
///
/// `Ok(None)` means the operator did not answer in time.
#[async_trait]
pub trait HumanInteraction: Send + Sync {
    async fn present_choices(
        &self,
        prompt: &str,
        choices: &[GateChoice],
    ) -> Result<Option<GateChoice>, InteractionError>;

    async fn request_freeform(
        &self,
        prompt: &str,
        timeout: Duration,
    ) -> Result<Option<String>, InteractionError>;
}
