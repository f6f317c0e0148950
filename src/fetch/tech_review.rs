// src/fetch/tech_review.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::counter;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};

use crate::fetch::types::{Article, ArticleFetcher};

const BASE_URL: &str = "https://www.technologyreview.com";
const TOPIC_URL: &str = "https://www.technologyreview.com/topic/artificial-intelligence";

/// At most this many candidate elements are considered per page load.
const MAX_ELEMENTS: usize = 5;

static SEL_ARTICLE: Lazy<Selector> = Lazy::new(|| Selector::parse("article").unwrap());
static SEL_HEADLINE: Lazy<Selector> = Lazy::new(|| Selector::parse("h2 a, h3 a").unwrap());
static SEL_EXCERPT: Lazy<Selector> = Lazy::new(|| Selector::parse(".excerpt, p").unwrap());
static SEL_TIME: Lazy<Selector> = Lazy::new(|| Selector::parse("time").unwrap());

/// HTML-scrape source: the MIT Technology Review AI topic page. An element
/// missing a title or link is skipped; the whole fetch fails only when the
/// page itself cannot be retrieved.
pub struct TechReviewFetcher {
    url: String,
    client: reqwest::Client,
}

impl TechReviewFetcher {
    pub fn new() -> Result<Self> {
        Ok(Self {
            url: TOPIC_URL.to_string(),
            client: crate::fetch::http_client()?,
        })
    }
}

pub fn parse_topic_page(html: &str, fetched_at: DateTime<Utc>) -> Vec<Article> {
    let document = Html::parse_document(html);

    let mut out = Vec::new();
    for element in document.select(&SEL_ARTICLE).take(MAX_ELEMENTS) {
        let Some(headline) = element.select(&SEL_HEADLINE).next() else {
            continue;
        };
        let title = crate::fetch::strip_html(&headline.text().collect::<String>());
        let Some(href) = headline.value().attr("href") else {
            continue;
        };
        if title.is_empty() || href.is_empty() {
            continue;
        }
        let url = if href.starts_with("http") {
            href.to_string()
        } else {
            format!("{BASE_URL}{href}")
        };

        let summary = element
            .select(&SEL_EXCERPT)
            .next()
            .map(|e| crate::fetch::strip_html(&e.text().collect::<String>()))
            .filter(|s| !s.is_empty());
        let published_at = element
            .select(&SEL_TIME)
            .next()
            .and_then(|t| t.value().attr("datetime"))
            .and_then(crate::fetch::parse_rfc3339_utc)
            .unwrap_or(fetched_at);

        out.push(Article {
            title,
            summary,
            url,
            source: "MIT Technology Review".to_string(),
            published_at,
            image_url: None,
        });
    }

    counter!("fetch_articles_total").increment(out.len() as u64);
    out
}

#[async_trait]
impl ArticleFetcher for TechReviewFetcher {
    async fn fetch_latest(&self) -> Result<Vec<Article>> {
        let body = self
            .client
            .get(&self.url)
            .send()
            .await
            .context("tech review http get()")?
            .error_for_status()
            .context("tech review non-2xx")?
            .text()
            .await
            .context("tech review http .text()")?;
        Ok(parse_topic_page(&body, Utc::now()))
    }

    fn name(&self) -> &'static str {
        "MIT Technology Review"
    }
}
