//! Content-Sources: raw material providers for Scrivener
//!
//! This crate fetches raw items from external sources given a topic and
//! returns them as normalized [`ContentRecord`]s. Three providers ship:
//!
//! - [`ForumProvider`]: searches a fixed set of sub-communities and keeps the
//!   top match of each, with one top comment. Tolerates partial failure.
//! - [`NewsProvider`]: a single news search query. Any failure is hard.
//! - [`LocalCorpusProvider`]: reads one pre-existing text file.
//!
//! Providers only perform network or file reads; they never mutate local state.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod error;
pub mod forum;
pub mod local;
pub mod news;
mod record;

pub use error::{FetchCause, FetchError, FetchResult};
pub use forum::{ForumConfig, ForumProvider};
pub use local::{LocalConfig, LocalCorpusProvider};
pub use news::{NewsConfig, NewsMode, NewsProvider};
pub use record::ContentRecord;

/// The user agent sent by the HTTP providers.
pub const USER_AGENT: &str = concat!("scrivener-content-sources/", env!("CARGO_PKG_VERSION"));

/// A named external source of raw content.
#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// Stable provider name used in logs and errors.
    fn name(&self) -> &str;

    /// Fetch up to `count` records about `topic`.
    ///
    /// `topic` must be non-blank and `count` at least 1.
    async fn fetch(&self, topic: &str, count: usize) -> FetchResult<Vec<ContentRecord>>;
}

/// The kinds of source a session can be seeded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Forum,
    News,
    Local,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SourceKind::Forum => "forum",
            SourceKind::News => "news",
            SourceKind::Local => "local",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "forum" | "reddit" => Ok(SourceKind::Forum),
            "news" | "newsapi" => Ok(SourceKind::News),
            "local" | "file" => Ok(SourceKind::Local),
            other => Err(format!("unknown source kind: {other}")),
        }
    }
}

/// Check the shared `fetch` input constraints.
pub fn validate_request(provider: &str, topic: &str, count: usize) -> FetchResult<()> {
    if topic.trim().is_empty() {
        return Err(FetchError::new(
            provider,
            FetchCause::InvalidRequest("topic must not be empty".to_string()),
        ));
    }
    if count == 0 {
        return Err(FetchError::new(
            provider,
            FetchCause::InvalidRequest("count must be at least 1".to_string()),
        ));
    }
    Ok(())
}
