//! Forum-style provider backed by the Reddit OAuth API.
//!
//! Searches each configured sub-community for the topic, keeps the top match
//! and augments it with the first top-level comment. A failing community is
//! logged and skipped; the fetch as a whole never fails because of one.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{FetchCause, FetchResult};
use crate::{validate_request, ContentProvider, ContentRecord, USER_AGENT};

/// Forum provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForumConfig {
    /// API base URL
    pub base_url: String,
    /// OAuth bearer token
    #[serde(skip_serializing)]
    pub access_token: Option<String>,
    /// Sub-communities searched, in order
    pub communities: Vec<String>,
    /// Sort order for the per-community search
    pub sort: String,
}

impl Default for ForumConfig {
    fn default() -> Self {
        ForumConfig {
            base_url: std::env::var("REDDIT_API_URL")
                .unwrap_or_else(|_| "https://oauth.reddit.com".to_string()),
            access_token: std::env::var("REDDIT_ACCESS_TOKEN").ok(),
            communities: vec![
                "artificialintelligence".to_string(),
                "machinelearning".to_string(),
                "indiehacking".to_string(),
            ],
            sort: "hot".to_string(),
        }
    }
}

impl ForumConfig {
    /// Create a new config from environment variables
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Create config for a specific server and community list
    pub fn new(base_url: &str, communities: &[&str]) -> Self {
        ForumConfig {
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: None,
            communities: communities.iter().map(|c| c.to_string()).collect(),
            sort: "hot".to_string(),
        }
    }

    /// Set the bearer token
    pub fn with_token(mut self, token: &str) -> Self {
        self.access_token = Some(token.to_string());
        self
    }
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: ChildData,
}

#[derive(Debug, Deserialize)]
struct ChildData {
    id: Option<String>,
    title: Option<String>,
    #[serde(default)]
    selftext: String,
    author: Option<String>,
    permalink: Option<String>,
    body: Option<String>,
}

/// Provider that searches a fixed set of forum communities.
pub struct ForumProvider {
    config: ForumConfig,
    http_client: reqwest::Client,
}

impl ForumProvider {
    /// Create a new forum provider
    pub fn new(config: ForumConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        ForumProvider {
            config,
            http_client,
        }
    }

    /// Create provider from environment variables
    pub fn from_env() -> Self {
        Self::new(ForumConfig::from_env())
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        let request = self.http_client.get(url);
        match &self.config.access_token {
            Some(token) => request.header("Authorization", format!("bearer {token}")),
            None => request,
        }
    }

    /// Search one community and return its top match, if any.
    async fn search_community(&self, community: &str, topic: &str) -> Result<Option<ContentRecord>, FetchCause> {
        let url = format!("{}/r/{}/search", self.config.base_url, community);
        let response = self
            .get(&url)
            .query(&[
                ("q", topic),
                ("restrict_sr", "on"),
                ("sort", self.config.sort.as_str()),
                ("limit", "1"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchCause::Status {
                status: status.as_u16(),
                body,
            });
        }

        let listing: Listing = response.json().await?;
        let Some(post) = listing.data.children.into_iter().next() else {
            return Ok(None);
        };
        let post = post.data;

        let mut record = ContentRecord::new(
            format!("r/{community}"),
            post.title.unwrap_or_else(|| "N/A".to_string()),
            post.selftext,
        );
        if let Some(author) = post.author {
            record = record.with_author(author);
        }
        if let Some(permalink) = post.permalink {
            record = record.with_url(format!("https://www.reddit.com{permalink}"));
        }
        if let Some(id) = post.id {
            if let Some(comment) = self.top_comment(&id).await {
                record = record.with_snippet(comment);
            }
        }
        Ok(Some(record))
    }

    /// First top-level comment of a post. Any failure yields `None`.
    async fn top_comment(&self, post_id: &str) -> Option<String> {
        let url = format!("{}/comments/{}", self.config.base_url, post_id);
        let response = match self.get(&url).send().await {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                debug!(post_id, status = r.status().as_u16(), "comment fetch failed");
                return None;
            }
            Err(e) => {
                debug!(post_id, error = %e, "comment fetch failed");
                return None;
            }
        };

        let listings: Vec<Listing> = response.json().await.ok()?;
        listings
            .into_iter()
            .nth(1)?
            .data
            .children
            .into_iter()
            .find_map(|c| c.data.body)
    }
}

#[async_trait]
impl ContentProvider for ForumProvider {
    fn name(&self) -> &str {
        "forum"
    }

    async fn fetch(&self, topic: &str, count: usize) -> FetchResult<Vec<ContentRecord>> {
        validate_request(self.name(), topic, count)?;
        info!(topic, communities = self.config.communities.len(), "searching forum communities");

        let mut records = Vec::new();
        for community in &self.config.communities {
            match self.search_community(community, topic).await {
                Ok(Some(record)) => records.push(record),
                Ok(None) => debug!(community = %community, "no match in community"),
                Err(cause) => {
                    warn!(
                        event = "fetch.degraded",
                        provider = "forum",
                        community = %community,
                        error = %cause,
                        "failed to fetch data from community, skipping"
                    );
                }
            }
        }

        records.truncate(count);
        Ok(records)
    }
}
