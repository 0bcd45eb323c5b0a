use std::path::PathBuf;

use garble_core::SourceItem;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid source file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Yields the next batch of candidate source texts.
#[async_trait::async_trait]
pub trait SourceFeed: Send + Sync {
    async fn fetch(&self) -> Result<Vec<SourceItem>, SourceError>;
}

/// Reads a JSON array of `{id, text}` objects from disk on every fetch.
#[derive(Debug, Clone)]
pub struct FileSourceFeed {
    path: PathBuf,
}

impl FileSourceFeed {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl SourceFeed for FileSourceFeed {
    async fn fetch(&self) -> Result<Vec<SourceItem>, SourceError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("source file {} does not exist", self.path.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };
        let items: Vec<SourceItem> = serde_json::from_str(&content)?;
        Ok(items
            .into_iter()
            .filter(|item| !item.text.trim().is_empty())
            .collect())
    }
}
