//! Deterministic stand-ins for the external capabilities.
//!
//! `EchoGenerator` doubles as the offline generator for dry runs. The
//! scripted fakes replay a fixed sequence of answers so the orchestrator can
//! be exercised without a terminal, a model or the network.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use content_sources::{ContentProvider, ContentRecord, FetchCause, FetchError, FetchResult};
use tokio::sync::Mutex;

use crate::generation::{GenerationError, GenerationRequest, GenerationResult, Generator};
use crate::human_gate::{GateChoice, HumanInteraction, InteractionError};

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

/// Replies with a line naming the role and how far the conversation got.
#[derive(Debug, Default, Clone)]
pub struct EchoGenerator;

impl EchoGenerator {
    pub fn new() -> Self {
        Self
    }

    pub fn reply_for(request: &GenerationRequest<'_>) -> String {
        let own = request
            .transcript
            .iter()
            .filter(|t| t.speaker == request.role.name)
            .count();
        format!(
            "{} draft {} after {} turn(s)",
            request.role.name,
            own + 1,
            request.transcript.len()
        )
    }
}

#[async_trait]
impl Generator for EchoGenerator {
    async fn generate(&self, request: GenerationRequest<'_>) -> GenerationResult<String> {
        Ok(Self::reply_for(&request))
    }
}

/// Plays back queued results, then echoes.
#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    script: Mutex<VecDeque<GenerationResult<String>>>,
    calls: Mutex<u32>,
    delay: Option<Duration>,
}

impl ScriptedGenerator {
    pub fn new(script: Vec<GenerationResult<String>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: Mutex::new(0),
            delay: None,
        }
    }

    /// Always fails with a fatal error.
    pub fn fatal(message: &str) -> Self {
        Self::new(vec![Err(GenerationError::Fatal(message.to_string()))])
    }

    /// Sleep before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub async fn calls(&self) -> u32 {
        *self.calls.lock().await
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(&self, request: GenerationRequest<'_>) -> GenerationResult<String> {
        *self.calls.lock().await += 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.script.lock().await.pop_front() {
            Some(result) => result,
            None => Ok(EchoGenerator::reply_for(&request)),
        }
    }
}

// ---------------------------------------------------------------------------
// Human
// ---------------------------------------------------------------------------

/// One scripted operator action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HumanStep {
    /// Pick a choice at a feedback request.
    Choose(GateChoice),
    /// Type free text.
    Type(String),
    /// Let the request time out.
    Silent,
    /// Never answer; the gate's own timeout fires.
    Hang,
    /// The presentation layer disconnects.
    Disconnect,
}

/// Operator that follows a script. Once the script runs out every request
/// times out.
#[derive(Debug, Default)]
pub struct ScriptedHuman {
    script: Mutex<VecDeque<HumanStep>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedHuman {
    pub fn new(script: Vec<HumanStep>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Chooses `Continue` `n` times.
    pub fn continuing(n: usize) -> Self {
        Self::new(vec![HumanStep::Choose(GateChoice::Continue); n])
    }

    /// Prompts seen so far, in order.
    pub async fn prompts(&self) -> Vec<String> {
        self.prompts.lock().await.clone()
    }

    /// Steps not yet consumed.
    pub async fn remaining(&self) -> usize {
        self.script.lock().await.len()
    }

    async fn next(&self, prompt: &str) -> Option<HumanStep> {
        self.prompts.lock().await.push(prompt.to_string());
        self.script.lock().await.pop_front()
    }
}

#[async_trait]
impl HumanInteraction for ScriptedHuman {
    async fn present_choices(
        &self,
        prompt: &str,
        _choices: &[GateChoice],
    ) -> Result<Option<GateChoice>, InteractionError> {
        match self.next(prompt).await {
            Some(HumanStep::Choose(choice)) => Ok(Some(choice)),
            Some(HumanStep::Silent) | None => Ok(None),
            Some(HumanStep::Hang) => std::future::pending().await,
            Some(HumanStep::Disconnect) => Err(InteractionError("disconnected".to_string())),
            Some(other) => Err(InteractionError(format!("expected a choice, script had {other:?}"))),
        }
    }

    async fn request_freeform(
        &self,
        prompt: &str,
        _timeout: Duration,
    ) -> Result<Option<String>, InteractionError> {
        match self.next(prompt).await {
            Some(HumanStep::Type(text)) => Ok(Some(text)),
            Some(HumanStep::Silent) | None => Ok(None),
            Some(HumanStep::Hang) => std::future::pending().await,
            Some(HumanStep::Disconnect) => Err(InteractionError("disconnected".to_string())),
            Some(other) => Err(InteractionError(format!("expected text, script had {other:?}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Content
// ---------------------------------------------------------------------------

/// Provider returning fixed records, or failing with a fixed status.
#[derive(Debug, Clone)]
pub struct StaticProvider {
    name: String,
    records: Vec<ContentRecord>,
    fail_status: Option<u16>,
}

impl StaticProvider {
    pub fn new(name: &str, records: Vec<ContentRecord>) -> Self {
        Self {
            name: name.to_string(),
            records,
            fail_status: None,
        }
    }

    pub fn failing(name: &str, status: u16) -> Self {
        Self {
            name: name.to_string(),
            records: Vec::new(),
            fail_status: Some(status),
        }
    }
}

#[async_trait]
impl ContentProvider for StaticProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, topic: &str, count: usize) -> FetchResult<Vec<ContentRecord>> {
        content_sources::validate_request(&self.name, topic, count)?;
        if let Some(status) = self.fail_status {
            return Err(FetchError::new(
                &self.name,
                FetchCause::Status {
                    status,
                    body: "scripted failure".to_string(),
                },
            ));
        }
        Ok(self.records.iter().take(count).cloned().collect())
    }
}
