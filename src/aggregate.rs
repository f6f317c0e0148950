// src/aggregate.rs
//
// Fan-out over all configured sources, fan-in tolerating per-source failure,
// then the pure merge step: recency filter, newest-first sort, URL dedup,
// length cap. One `now` snapshot is taken per run and threaded through so
// the window cannot drift while slow sources are still responding.

use chrono::{DateTime, Duration, Utc};
use futures::future::join_all;
use metrics::counter;
use std::collections::HashSet;

use crate::config::PushConfig;
use crate::fetch::types::{Article, ArticleFetcher};

pub struct Aggregator {
    fetchers: Vec<Box<dyn ArticleFetcher>>,
    window: Duration,
    max_articles: usize,
}

impl Aggregator {
    pub fn new(fetchers: Vec<Box<dyn ArticleFetcher>>, cfg: &PushConfig) -> Self {
        Self {
            fetchers,
            window: Duration::hours(cfg.recency_window_hours),
            max_articles: cfg.max_articles,
        }
    }

    /// Fetch from every source concurrently and merge the results. A failing
    /// source is logged and counted, never propagated; an empty result is a
    /// valid outcome, not an error.
    pub async fn fetch_all(&self, now: DateTime<Utc>) -> Vec<Article> {
        let results = join_all(self.fetchers.iter().map(|f| f.fetch_latest())).await;

        let mut all = Vec::new();
        for (fetcher, result) in self.fetchers.iter().zip(results) {
            match result {
                Ok(mut articles) => {
                    tracing::debug!(source = fetcher.name(), count = articles.len(), "source ok");
                    all.append(&mut articles);
                }
                Err(e) => {
                    tracing::warn!(error = ?e, source = fetcher.name(), "source fetch failed");
                    counter!("fetch_source_errors_total").increment(1);
                }
            }
        }

        let feed = aggregate_articles(now, self.window, self.max_articles, all);
        tracing::info!(count = feed.len(), "aggregated feed ready");
        feed
    }
}

/// Pure merge step, separated for tests: keep articles published inside
/// `[now - window, now]`, sort newest-first (stable, so equal timestamps
/// keep their discovery order), drop canonical-URL duplicates keeping the
/// first occurrence in sort order, cap the result length.
pub fn aggregate_articles(
    now: DateTime<Utc>,
    window: Duration,
    max_articles: usize,
    articles: Vec<Article>,
) -> Vec<Article> {
    let lower = now - window;
    let mut kept: Vec<Article> = articles
        .into_iter()
        .filter(|a| a.published_at >= lower && a.published_at <= now)
        .collect();

    kept.sort_by(|a, b| b.published_at.cmp(&a.published_at));

    let mut seen: HashSet<String> = HashSet::new();
    kept.retain(|a| seen.insert(canonical_url(&a.url)));

    kept.truncate(max_articles);
    kept
}

/// Dedup key for an article link: scheme-insensitive, lowercased host,
/// trailing slash stripped. Unparseable links fall back to the trimmed raw
/// string so they still dedup against exact repeats.
pub fn canonical_url(raw: &str) -> String {
    match url::Url::parse(raw.trim()) {
        Ok(u) => {
            let host = u.host_str().unwrap_or_default().to_ascii_lowercase();
            let path = u.path().trim_end_matches('/');
            match u.query() {
                Some(q) => format!("{host}{path}?{q}"),
                None => format!("{host}{path}"),
            }
        }
        Err(_) => raw
            .trim()
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/')
            .to_string(),
    }
}
