//! News provider backed by NewsAPI.
//!
//! Searches the `everything` endpoint by default, or the `top-headlines`
//! endpoint when configured. A single query either way; any transport,
//! status or decode failure is a hard error.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{FetchCause, FetchError, FetchResult};
use crate::{validate_request, ContentProvider, ContentRecord, USER_AGENT};

/// Which NewsAPI endpoint a fetch queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NewsMode {
    /// Full-archive search, filtered by `domains`, `from` and `to`.
    #[default]
    Everything,
    /// Breaking headlines, filtered by `country`, `category` and `sources`.
    TopHeadlines,
}

/// News provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsConfig {
    pub mode: NewsMode,
    /// Search endpoint
    pub endpoint: String,
    /// Top-headlines endpoint
    pub headlines_endpoint: String,
    /// API key
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub language: String,
    pub sort_by: String,
    /// Comma-separated domains to restrict a search to
    pub domains: Option<String>,
    /// Oldest publication date, `YYYY-MM-DD`
    pub from: Option<String>,
    /// Newest publication date, `YYYY-MM-DD`
    pub to: Option<String>,
    /// Two-letter country code for headlines
    pub country: Option<String>,
    pub category: Option<String>,
    /// Comma-separated source ids for headlines
    pub sources: Option<String>,
}

impl Default for NewsConfig {
    fn default() -> Self {
        let mut config = Self::new(
            &std::env::var("NEWSAPI_URL")
                .unwrap_or_else(|_| "https://newsapi.org/v2/everything".to_string()),
        );
        if let Ok(url) = std::env::var("NEWSAPI_HEADLINES_URL") {
            config.headlines_endpoint = url;
        }
        config.api_key = std::env::var("NEWSAPI_API_KEY").ok();
        config
    }
}

impl NewsConfig {
    /// Create a new config from environment variables
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Create config for a specific search endpoint
    pub fn new(endpoint: &str) -> Self {
        NewsConfig {
            mode: NewsMode::Everything,
            endpoint: endpoint.to_string(),
            headlines_endpoint: "https://newsapi.org/v2/top-headlines".to_string(),
            api_key: None,
            language: "en".to_string(),
            sort_by: "popularity".to_string(),
            domains: None,
            from: None,
            to: None,
            country: None,
            category: None,
            sources: None,
        }
    }

    /// Set the API key
    pub fn with_api_key(mut self, key: &str) -> Self {
        self.api_key = Some(key.to_string());
        self
    }

    /// Query the top-headlines endpoint at `endpoint` instead of searching.
    pub fn with_headlines(mut self, endpoint: &str) -> Self {
        self.mode = NewsMode::TopHeadlines;
        self.headlines_endpoint = endpoint.to_string();
        self
    }

    fn url(&self) -> &str {
        match self.mode {
            NewsMode::Everything => &self.endpoint,
            NewsMode::TopHeadlines => &self.headlines_endpoint,
        }
    }

    /// Query parameters for one fetch; unset filters are left out.
    fn query(&self, topic: &str, count: usize) -> Vec<(&'static str, String)> {
        let mut params = vec![("q", topic.to_string()), ("pageSize", count.to_string())];
        let filters = match self.mode {
            NewsMode::Everything => {
                params.push(("language", self.language.clone()));
                params.push(("sortBy", self.sort_by.clone()));
                [
                    ("domains", &self.domains),
                    ("from", &self.from),
                    ("to", &self.to),
                ]
            }
            NewsMode::TopHeadlines => [
                ("country", &self.country),
                ("category", &self.category),
                ("sources", &self.sources),
            ],
        };
        params.extend(
            filters
                .into_iter()
                .filter_map(|(name, value)| value.clone().map(|v| (name, v))),
        );
        params
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Deserialize)]
struct Article {
    source: Option<ArticleSource>,
    author: Option<String>,
    title: Option<String>,
    description: Option<String>,
    content: Option<String>,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ArticleSource {
    name: Option<String>,
}

impl From<Article> for ContentRecord {
    fn from(article: Article) -> Self {
        let source = article
            .source
            .and_then(|s| s.name)
            .unwrap_or_else(|| "news".to_string());
        let mut record = ContentRecord::new(
            source,
            article.title.unwrap_or_else(|| "N/A".to_string()),
            article.content.unwrap_or_default(),
        );
        record.author = article.author;
        record.description = article.description;
        record.url = article.url;
        record
    }
}

/// Provider that runs one news search per fetch.
pub struct NewsProvider {
    config: NewsConfig,
    http_client: reqwest::Client,
}

impl NewsProvider {
    /// Create a new news provider
    pub fn new(config: NewsConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        NewsProvider {
            config,
            http_client,
        }
    }

    /// Create provider from environment variables
    pub fn from_env() -> Self {
        Self::new(NewsConfig::from_env())
    }

    fn fail(&self, cause: FetchCause) -> FetchError {
        FetchError::new(self.name(), cause)
    }
}

#[async_trait]
impl ContentProvider for NewsProvider {
    fn name(&self) -> &str {
        "news"
    }

    async fn fetch(&self, topic: &str, count: usize) -> FetchResult<Vec<ContentRecord>> {
        validate_request(self.name(), topic, count)?;
        info!(topic, count, mode = ?self.config.mode, "querying news");

        let mut request = self
            .http_client
            .get(self.config.url())
            .query(&self.config.query(topic, count));
        if let Some(key) = &self.config.api_key {
            request = request.header("X-Api-Key", key);
        }

        let response = request.send().await.map_err(|e| self.fail(e.into()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(self.fail(FetchCause::Status {
                status: status.as_u16(),
                body,
            }));
        }

        let parsed: SearchResponse = response.json().await.map_err(|e| self.fail(e.into()))?;
        debug!(articles = parsed.articles.len(), "news search returned");

        Ok(parsed
            .articles
            .into_iter()
            .take(count)
            .map(ContentRecord::from)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_news_config_new_uses_defaults() {
        let config = NewsConfig::new("http://localhost/v2/everything");
        assert_eq!(config.language, "en");
        assert_eq!(config.sort_by, "popularity");
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_search_query_includes_only_set_filters() {
        let mut config = NewsConfig::new("http://localhost/v2/everything");
        config.domains = Some("techcrunch.com,thenextweb.com".to_string());
        config.country = Some("gb".to_string());

        let query = config.query("bitcoin", 5);
        assert!(query.contains(&("domains", "techcrunch.com,thenextweb.com".to_string())));
        assert!(query.contains(&("sortBy", "popularity".to_string())));
        assert!(!query.iter().any(|(name, _)| *name == "country" || *name == "from"));
    }

    #[test]
    fn test_headlines_query_uses_headline_filters() {
        let mut config =
            NewsConfig::new("http://localhost/v2/everything").with_headlines("http://localhost/v2/top-headlines");
        config.category = Some("business".to_string());
        config.domains = Some("ignored.com".to_string());

        assert_eq!(config.url(), "http://localhost/v2/top-headlines");
        let query = config.query("bitcoin", 3);
        assert!(query.contains(&("category", "business".to_string())));
        assert!(!query.iter().any(|(name, _)| *name == "domains" || *name == "sortBy"));
    }

    #[test]
    fn test_mode_parses_from_toml_style_value() {
        let config: NewsConfig =
            serde_json::from_value(serde_json::json!({ "mode": "top_headlines", "country": "us" })).unwrap();
        assert_eq!(config.mode, NewsMode::TopHeadlines);
        assert_eq!(config.country.as_deref(), Some("us"));
        assert_eq!(config.language, "en");
    }

    #[test]
    fn test_api_key_is_not_serialized() {
        let config = NewsConfig::new("http://localhost").with_api_key("k-123");
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("k-123"));
    }

    #[test]
    fn test_article_with_missing_fields_maps_to_record() {
        let article = Article {
            source: None,
            author: None,
            title: None,
            description: None,
            content: None,
            url: None,
        };
        let record = ContentRecord::from(article);
        assert_eq!(record.source, "news");
        assert_eq!(record.title, "N/A");
        assert!(record.body.is_empty());
        assert!(record.author.is_none());
    }
}
