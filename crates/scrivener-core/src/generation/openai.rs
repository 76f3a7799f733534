//! OpenAI-compatible chat completions adapter.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::capability::{GenerationRequest, Generator};
use super::error::{GenerationError, GenerationResult};

const USER_AGENT: &str = concat!("scrivener/", env!("CARGO_PKG_VERSION"));

/// Chat completions endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub endpoint: String,
    pub model: String,
    /// API key
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub temperature: Option<f32>,
    /// Sampling seed, for repeatable drafts where the backend supports it
    pub seed: Option<u64>,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        OpenAiConfig {
            endpoint: std::env::var("OPENAI_API_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1/chat/completions".to_string()),
            model: std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-3.5-turbo".to_string()),
            api_key: std::env::var("OPENAI_API_KEY").ok(),
            temperature: None,
            seed: Some(42),
        }
    }
}

impl OpenAiConfig {
    /// Create config for a specific endpoint and key
    pub fn new(endpoint: &str, api_key: &str) -> Self {
        OpenAiConfig {
            endpoint: endpoint.to_string(),
            model: "gpt-3.5-turbo".to_string(),
            api_key: Some(api_key.to_string()),
            temperature: None,
            seed: None,
        }
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// [`Generator`] backed by an OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiGenerator {
    config: OpenAiConfig,
    api_key: String,
    http_client: reqwest::Client,
}

impl OpenAiGenerator {
    /// Fails with `Fatal` when no API key is configured.
    pub fn new(config: OpenAiConfig) -> GenerationResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| GenerationError::Fatal("OPENAI_API_KEY is not set".to_string()))?;

        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| GenerationError::Fatal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            config,
            api_key,
            http_client,
        })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// System profile first, then the transcript. The role's own turns are
    /// sent as `assistant`, everyone else's as named `user` messages.
    fn build_messages<'a>(&self, request: &GenerationRequest<'a>) -> Vec<ChatMessage<'a>> {
        let mut messages = Vec::with_capacity(request.transcript.len() + 1);
        messages.push(ChatMessage {
            role: "system",
            content: &request.role.profile,
            name: None,
        });
        for turn in request.transcript {
            if turn.content.is_empty() {
                continue;
            }
            if turn.speaker == request.role.name {
                messages.push(ChatMessage {
                    role: "assistant",
                    content: &turn.content,
                    name: None,
                });
            } else {
                messages.push(ChatMessage {
                    role: "user",
                    content: &turn.content,
                    name: Some(&turn.speaker),
                });
            }
        }
        messages
    }
}

fn classify_status(status: reqwest::StatusCode, body: String) -> GenerationError {
    let msg = format!("HTTP {}: {}", status.as_u16(), body);
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS
        || status == reqwest::StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
    {
        GenerationError::Transient(msg)
    } else {
        GenerationError::Fatal(msg)
    }
}

#[async_trait]
impl Generator for OpenAiGenerator {
    async fn generate(&self, request: GenerationRequest<'_>) -> GenerationResult<String> {
        let body = ChatRequest {
            model: &self.config.model,
            messages: self.build_messages(&request),
            temperature: self.config.temperature,
            seed: self.config.seed,
        };
        debug!(
            role = %request.role.name,
            model = %self.config.model,
            messages = body.messages.len(),
            "requesting completion"
        );

        let response = self
            .http_client
            .post(&self.config.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::Transient(format!("transport error: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(classify_status(status, text));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Fatal(format!("malformed completion: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| GenerationError::Fatal("completion had no content".to_string()))
    }
}
