//! Human gate state machine.

use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::capability::{GateChoice, HumanInteraction};
use super::error::GateResult;
use crate::metrics::METRICS;

/// Prompt issued at the human-proxy slot of the rotation.
pub const FEEDBACK_PROMPT: &str = "Provide feedback to chat_manager. Press enter to skip and use auto-reply, or type 'exit' to end the conversation: ";

/// Question shown with the three choices.
pub const CHOICE_PROMPT: &str = "Continue or provide feedback?";

/// Control token that ends a session.
pub const EXIT_TOKEN: &str = "exit";

/// Timeouts and recognition pattern for the gate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GateConfig {
    /// How long to wait for continue / feedback / exit (seconds).
    pub choice_timeout_secs: u64,
    /// How long to wait for free text (seconds).
    pub freeform_timeout_secs: u64,
    /// Prompts matching this pattern get the three-choice treatment.
    pub feedback_pattern: String,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            choice_timeout_secs: 300,
            freeform_timeout_secs: 60,
            feedback_pattern: r"^Provide feedback to \S+\. Press enter to skip and use auto-reply"
                .to_string(),
        }
    }
}

impl GateConfig {
    pub fn choice_timeout(&self) -> Duration {
        Duration::from_secs(self.choice_timeout_secs)
    }

    pub fn freeform_timeout(&self) -> Duration {
        Duration::from_secs(self.freeform_timeout_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GateState {
    AwaitingPrompt,
    AwaitingAction,
    AwaitingFreeform,
    Resolved,
}

/// What one pass through the gate produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    /// Text for the human-proxy turn. Empty means "no override".
    Resolved(String),
    /// No choice arrived before the choice timeout.
    Unanswered,
}

/// Intercepts the human-proxy turn and turns operator input into reply text.
#[derive(Debug)]
pub struct HumanGate {
    config: GateConfig,
    pattern: Regex,
    state: GateState,
    last_state: GateState,
}

impl HumanGate {
    pub fn new(config: GateConfig) -> GateResult<Self> {
        let pattern = Regex::new(&config.feedback_pattern)?;
        Ok(Self {
            config,
            pattern,
            state: GateState::AwaitingPrompt,
            last_state: GateState::AwaitingPrompt,
        })
    }

    /// Current state. Always `AwaitingPrompt` between calls.
    pub fn state(&self) -> GateState {
        self.state
    }

    /// State the previous `resolve` call ended in.
    pub fn last_state(&self) -> GateState {
        self.last_state
    }

    pub fn is_feedback_request(&self, prompt: &str) -> bool {
        self.pattern.is_match(prompt)
    }

    /// Run one prompt through the gate, then re-arm it.
    pub async fn resolve(
        &mut self,
        prompt: &str,
        human: &dyn HumanInteraction,
    ) -> GateResult<GateOutcome> {
        self.state = GateState::AwaitingPrompt;
        let result = self.step(prompt, human).await;
        self.last_state = self.state;
        self.state = GateState::AwaitingPrompt;
        result
    }

    async fn step(&mut self, prompt: &str, human: &dyn HumanInteraction) -> GateResult<GateOutcome> {
        if self.is_feedback_request(prompt) {
            self.state = GateState::AwaitingAction;
            METRICS.inc_gate_prompts();

            let choice = match tokio::time::timeout(
                self.config.choice_timeout(),
                human.present_choices(CHOICE_PROMPT, &GateChoice::ALL),
            )
            .await
            {
                Ok(answer) => answer?,
                Err(_elapsed) => None,
            };
            debug!(choice = ?choice, "gate choice received");

            match choice {
                None => return Ok(GateOutcome::Unanswered),
                Some(GateChoice::Continue) => return Ok(self.resolved(String::new())),
                Some(GateChoice::Exit) => return Ok(self.resolved(EXIT_TOKEN.to_string())),
                Some(GateChoice::Feedback) => {}
            }
        }

        self.state = GateState::AwaitingFreeform;
        let timeout = self.config.freeform_timeout();
        let text = match tokio::time::timeout(timeout, human.request_freeform(prompt, timeout)).await
        {
            Ok(answer) => answer?,
            Err(_elapsed) => None,
        };
        Ok(self.resolved(text.map(|t| t.trim().to_string()).unwrap_or_default()))
    }

    fn resolved(&mut self, text: String) -> GateOutcome {
        self.state = GateState::Resolved;
        GateOutcome::Resolved(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_pattern_matches_feedback_prompt() {
        let gate = HumanGate::new(GateConfig::default()).unwrap();
        assert!(gate.is_feedback_request(FEEDBACK_PROMPT));
        assert!(gate.is_feedback_request(
            "Provide feedback to Writer. Press enter to skip and use auto-reply"
        ));
        assert!(!gate.is_feedback_request("Please describe the audience"));
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let config = GateConfig {
            feedback_pattern: "(".to_string(),
            ..Default::default()
        };
        assert!(HumanGate::new(config).is_err());
    }

    #[test]
    fn test_new_gate_is_armed() {
        let gate = HumanGate::new(GateConfig::default()).unwrap();
        assert_eq!(gate.state(), GateState::AwaitingPrompt);
    }
}
