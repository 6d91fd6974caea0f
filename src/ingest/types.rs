// src/ingest/types.rs
use crate::error::FetchError;

/// One feed entry as the source delivered it (text may still carry HTML).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawItem {
    pub id: String,
    pub title: String,
    pub link: String,
    pub summary: String,
    pub category: Option<String>,
}

#[async_trait::async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch_latest(&self) -> Result<Vec<RawItem>, FetchError>;
    fn name(&self) -> &str;
}
