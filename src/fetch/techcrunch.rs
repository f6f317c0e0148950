// src/fetch/techcrunch.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::counter;
use serde::Deserialize;

use crate::fetch::types::{Article, ArticleFetcher};

const ENDPOINT: &str = "https://techcrunch.com/wp-json/wp/v2/posts?categories=149264&per_page=10&_embed";

#[derive(Debug, Deserialize)]
struct Post {
    title: Rendered,
    #[serde(default)]
    excerpt: Option<Rendered>,
    link: Option<String>,
    date: Option<String>,
    #[serde(rename = "_embedded", default)]
    embedded: Option<Embedded>,
}

#[derive(Debug, Deserialize)]
struct Rendered {
    #[serde(default)]
    rendered: String,
}

#[derive(Debug, Deserialize)]
struct Embedded {
    #[serde(rename = "wp:featuredmedia", default)]
    featured_media: Option<Vec<Media>>,
}

#[derive(Debug, Deserialize)]
struct Media {
    #[serde(default)]
    source_url: Option<String>,
}

/// Structured-API source: the TechCrunch AI category over the WordPress
/// JSON API. Missing optional fields become `None`, never a fetch failure.
pub struct TechCrunchFetcher {
    url: String,
    client: reqwest::Client,
}

impl TechCrunchFetcher {
    pub fn new() -> Result<Self> {
        Ok(Self {
            url: ENDPOINT.to_string(),
            client: crate::fetch::http_client()?,
        })
    }
}

pub fn parse_posts(json: &str, fetched_at: DateTime<Utc>) -> Result<Vec<Article>> {
    let posts: Vec<Post> = serde_json::from_str(json).context("parsing techcrunch json")?;

    let mut out = Vec::with_capacity(posts.len());
    for post in posts {
        let title = crate::fetch::strip_html(&post.title.rendered);
        let url = post.link.unwrap_or_default();
        if title.is_empty() || url.is_empty() {
            continue;
        }

        let summary = post
            .excerpt
            .map(|e| crate::fetch::strip_html(&e.rendered))
            .filter(|s| !s.is_empty());
        let image_url = post
            .embedded
            .and_then(|e| e.featured_media)
            .and_then(|m| m.into_iter().next())
            .and_then(|m| m.source_url);

        out.push(Article {
            title,
            summary,
            url,
            source: "TechCrunch".to_string(),
            published_at: post
                .date
                .as_deref()
                .and_then(crate::fetch::parse_rfc3339_utc)
                .unwrap_or(fetched_at),
            image_url,
        });
    }

    counter!("fetch_articles_total").increment(out.len() as u64);
    Ok(out)
}

#[async_trait]
impl ArticleFetcher for TechCrunchFetcher {
    async fn fetch_latest(&self) -> Result<Vec<Article>> {
        let body = self
            .client
            .get(&self.url)
            .send()
            .await
            .context("techcrunch http get()")?
            .error_for_status()
            .context("techcrunch non-2xx")?
            .text()
            .await
            .context("techcrunch http .text()")?;
        parse_posts(&body, Utc::now())
    }

    fn name(&self) -> &'static str {
        "TechCrunch"
    }
}
