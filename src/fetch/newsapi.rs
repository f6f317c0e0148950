// src/fetch/newsapi.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::counter;
use serde::Deserialize;

use crate::fetch::types::{Article, ArticleFetcher};

const ENDPOINT: &str = "https://newsapi.org/v2/everything?q=artificial+intelligence+OR+AI+OR+machine+learning&language=en&sortBy=publishedAt&pageSize=10";

#[derive(Debug, Deserialize)]
struct Everything {
    #[serde(default)]
    articles: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    source: Option<ItemSource>,
    #[serde(rename = "publishedAt")]
    published_at: Option<String>,
    #[serde(rename = "urlToImage")]
    url_to_image: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ItemSource {
    name: Option<String>,
}

/// Keyed-API source: NewsAPI `everything` search. Without NEWS_API_KEY the
/// fetcher short-circuits to an empty success so the rest of the pipeline
/// is unaffected.
pub struct NewsApiFetcher {
    api_key: Option<String>,
    url: String,
    client: reqwest::Client,
}

impl NewsApiFetcher {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            api_key: std::env::var("NEWS_API_KEY").ok().filter(|k| !k.is_empty()),
            url: ENDPOINT.to_string(),
            client: crate::fetch::http_client()?,
        })
    }
}

pub fn parse_everything(json: &str, fetched_at: DateTime<Utc>) -> Result<Vec<Article>> {
    let resp: Everything = serde_json::from_str(json).context("parsing newsapi json")?;

    let mut out = Vec::with_capacity(resp.articles.len());
    for it in resp.articles {
        let title = it.title.unwrap_or_default();
        let url = it.url.unwrap_or_default();
        if title.is_empty() || url.is_empty() {
            continue;
        }

        out.push(Article {
            title,
            summary: it.description.filter(|s| !s.is_empty()),
            url,
            source: it
                .source
                .and_then(|s| s.name)
                .unwrap_or_else(|| "NewsAPI".to_string()),
            published_at: it
                .published_at
                .as_deref()
                .and_then(crate::fetch::parse_rfc3339_utc)
                .unwrap_or(fetched_at),
            image_url: it.url_to_image,
        });
    }

    counter!("fetch_articles_total").increment(out.len() as u64);
    Ok(out)
}

#[async_trait]
impl ArticleFetcher for NewsApiFetcher {
    async fn fetch_latest(&self) -> Result<Vec<Article>> {
        let Some(key) = &self.api_key else {
            tracing::debug!("NewsAPI disabled (no NEWS_API_KEY)");
            return Ok(Vec::new());
        };

        let body = self
            .client
            .get(&self.url)
            .header("X-Api-Key", key)
            .send()
            .await
            .context("newsapi http get()")?
            .error_for_status()
            .context("newsapi non-2xx")?
            .text()
            .await
            .context("newsapi http .text()")?;
        parse_everything(&body, Utc::now())
    }

    fn name(&self) -> &'static str {
        "NewsAPI"
    }
}
