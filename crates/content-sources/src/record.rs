//! Normalized content record.

use serde::{Deserialize, Serialize};

/// One normalized unit of raw material from an external source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRecord {
    /// Source name (e.g. `r/machinelearning`, `BBC News`, `local`)
    pub source: String,
    /// Title or headline
    pub title: String,
    /// Author, when the source reports one
    pub author: Option<String>,
    /// Short description or summary
    pub description: Option<String>,
    /// Main text
    pub body: String,
    /// Ancillary snippets such as top community comments
    pub snippets: Vec<String>,
    /// Link back to the original item
    pub url: Option<String>,
}

impl ContentRecord {
    /// Create a record with just a source, title and body.
    pub fn new(source: impl Into<String>, title: impl Into<String>, body: impl Into<String>) -> Self {
        ContentRecord {
            source: source.into(),
            title: title.into(),
            author: None,
            description: None,
            body: body.into(),
            snippets: Vec::new(),
            url: None,
        }
    }

    /// Set the author
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Attach an ancillary snippet
    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippets.push(snippet.into());
        self
    }

    /// Set the URL
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_sets_optional_fields() {
        let record = ContentRecord::new("r/rust", "Async traits", "body")
            .with_author("ferris")
            .with_description("desc")
            .with_snippet("nice post")
            .with_url("https://example.com");

        assert_eq!(record.author.as_deref(), Some("ferris"));
        assert_eq!(record.description.as_deref(), Some("desc"));
        assert_eq!(record.snippets, vec!["nice post".to_string()]);
        assert_eq!(record.url.as_deref(), Some("https://example.com"));
    }
}
