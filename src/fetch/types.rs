// src/fetch/types.rs
use anyhow::Result;
use chrono::{DateTime, Utc};

/// One normalized news article, as produced by any fetcher.
/// `title` and `url` are always non-empty; `published_at` is always a real
/// timestamp (fetchers substitute fetch time when the source omits one).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct Article {
    pub title: String,
    pub summary: Option<String>,
    pub url: String,
    pub source: String, // e.g., "TechCrunch", "VentureBeat"
    pub published_at: DateTime<Utc>,
    pub image_url: Option<String>,
}

/// One news source. An `Err` from `fetch_latest` is the failure outcome of
/// that source; the aggregator absorbs it and carries on with the others.
#[async_trait::async_trait]
pub trait ArticleFetcher: Send + Sync {
    async fn fetch_latest(&self) -> Result<Vec<Article>>;
    fn name(&self) -> &'static str;
}
