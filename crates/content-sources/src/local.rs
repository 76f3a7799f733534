//! Local corpus provider: reads one pre-existing text file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{FetchCause, FetchError, FetchResult};
use crate::{validate_request, ContentProvider, ContentRecord};

/// Local corpus configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalConfig {
    /// File whose contents become the corpus
    pub path: PathBuf,
}

impl Default for LocalConfig {
    fn default() -> Self {
        LocalConfig {
            path: PathBuf::from("articles.txt"),
        }
    }
}

impl LocalConfig {
    pub fn new(path: impl AsRef<Path>) -> Self {
        LocalConfig {
            path: path.as_ref().to_path_buf(),
        }
    }
}

/// Provider that returns the whole file as a single record.
///
/// `topic` is validated but otherwise ignored; the file is the content.
pub struct LocalCorpusProvider {
    config: LocalConfig,
}

impl LocalCorpusProvider {
    pub fn new(config: LocalConfig) -> Self {
        LocalCorpusProvider { config }
    }
}

#[async_trait]
impl ContentProvider for LocalCorpusProvider {
    fn name(&self) -> &str {
        "local"
    }

    async fn fetch(&self, topic: &str, count: usize) -> FetchResult<Vec<ContentRecord>> {
        validate_request(self.name(), topic, count)?;
        let path = &self.config.path;

        let text = match tokio::fs::read_to_string(path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(FetchError::new(
                    self.name(),
                    FetchCause::NotFound(path.display().to_string()),
                ));
            }
            Err(e) => return Err(FetchError::new(self.name(), e.into())),
        };

        info!(path = %path.display(), bytes = text.len(), "loaded local corpus");

        let title = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "local corpus".to_string());
        Ok(vec![ContentRecord::new("local", title, text)])
    }
}
