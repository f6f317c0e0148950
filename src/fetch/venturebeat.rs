// src/fetch/venturebeat.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::counter;
use quick_xml::de::from_str;
use serde::Deserialize;

use crate::fetch::types::{Article, ArticleFetcher};

const FEED_URL: &str = "https://venturebeat.com/category/ai/feed/";
const MAX_ITEMS: usize = 5;
const SUMMARY_CAP: usize = 200;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}
#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}
#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

/// Feed-scrape source: the VentureBeat AI category RSS feed. Items missing a
/// title or link are skipped; a malformed document is a failure outcome.
pub struct VentureBeatFetcher {
    url: String,
    client: reqwest::Client,
}

impl VentureBeatFetcher {
    pub fn new() -> Result<Self> {
        Ok(Self {
            url: FEED_URL.to_string(),
            client: crate::fetch::http_client()?,
        })
    }
}

pub fn parse_feed(xml: &str, fetched_at: DateTime<Utc>) -> Result<Vec<Article>> {
    let xml_clean = scrub_html_entities_for_xml(xml);
    let rss: Rss = from_str(&xml_clean).context("parsing venturebeat rss xml")?;

    let mut out = Vec::new();
    for it in rss.channel.item.into_iter().take(MAX_ITEMS) {
        let title = crate::fetch::strip_html(it.title.as_deref().unwrap_or_default());
        let url = it.link.unwrap_or_default();
        if title.is_empty() || url.is_empty() {
            continue;
        }

        let summary = it
            .description
            .as_deref()
            .map(crate::fetch::strip_html)
            .map(|s| crate::fetch::cap_chars(&s, SUMMARY_CAP))
            .filter(|s| !s.is_empty());

        out.push(Article {
            title,
            summary,
            url,
            source: "VentureBeat".to_string(),
            published_at: it
                .pub_date
                .as_deref()
                .and_then(crate::fetch::parse_rfc2822_utc)
                .unwrap_or(fetched_at),
            image_url: None,
        });
    }

    counter!("fetch_articles_total").increment(out.len() as u64);
    Ok(out)
}

#[async_trait]
impl ArticleFetcher for VentureBeatFetcher {
    async fn fetch_latest(&self) -> Result<Vec<Article>> {
        let body = self
            .client
            .get(&self.url)
            .send()
            .await
            .context("venturebeat http get()")?
            .error_for_status()
            .context("venturebeat non-2xx")?
            .text()
            .await
            .context("venturebeat http .text()")?;
        parse_feed(&body, Utc::now())
    }

    fn name(&self) -> &'static str {
        "VentureBeat"
    }
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}
