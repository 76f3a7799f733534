//! Scrivener configuration.
//!
//! Read from `scrivener.toml` in the working directory (or an explicit path).
//! Every section is optional and falls back to its defaults. Secrets are
//! never read from the file's serialized form; they come from the
//! environment (`OPENAI_API_KEY`, `REDDIT_ACCESS_TOKEN`, `NEWSAPI_API_KEY`).

use std::path::{Path, PathBuf};

use content_sources::{ForumConfig, LocalConfig, NewsConfig};
use serde::{Deserialize, Serialize};

use crate::corpus::DEFAULT_CORPUS_CEILING;
use crate::generation::{GenerationPolicy, OpenAiConfig};
use crate::human_gate::GateConfig;
use crate::orchestration::{OrchestratorSettings, DEFAULT_MAX_ROUNDS};
use crate::prompt::BriefConfig;

/// File looked up when no explicit path is given.
pub const DEFAULT_CONFIG_FILE: &str = "scrivener.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Session shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    pub max_rounds: u64,
    /// Corpus ceiling in characters
    pub corpus_ceiling: usize,
    /// Records requested from a provider
    pub fetch_count: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_rounds: DEFAULT_MAX_ROUNDS,
            corpus_ceiling: DEFAULT_CORPUS_CEILING,
            fetch_count: 5,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrivenerConfig {
    pub session: SessionConfig,
    pub gate: GateConfig,
    pub generation: GenerationPolicy,
    pub brief: BriefConfig,
    pub openai: OpenAiConfig,
    pub forum: ForumConfig,
    pub news: NewsConfig,
    pub local: LocalConfig,
}

impl ScrivenerConfig {
    /// Load from `path`, or from `scrivener.toml` if it exists, else defaults.
    ///
    /// An explicit path that cannot be read is an error.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Self::from_file(default)?
                } else {
                    Self::default()
                }
            }
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.session.max_rounds == 0 {
            return Err(ConfigError::Invalid(
                "session.max_rounds must be at least 1".to_string(),
            ));
        }
        if self.session.corpus_ceiling == 0 {
            return Err(ConfigError::Invalid(
                "session.corpus_ceiling must be at least 1".to_string(),
            ));
        }
        if self.session.fetch_count == 0 {
            return Err(ConfigError::Invalid(
                "session.fetch_count must be at least 1".to_string(),
            ));
        }
        if self.generation.timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "generation.timeout_ms must be at least 1".to_string(),
            ));
        }
        regex::Regex::new(&self.gate.feedback_pattern)
            .map_err(|e| ConfigError::Invalid(format!("gate.feedback_pattern: {e}")))?;
        Ok(())
    }

    /// Settings handed to each session's orchestrator.
    pub fn orchestrator_settings(&self) -> OrchestratorSettings {
        OrchestratorSettings {
            max_rounds: self.session.max_rounds,
            generation: self.generation.clone(),
            gate: self.gate.clone(),
            brief: self.brief.clone(),
        }
    }
}
