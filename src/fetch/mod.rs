// src/fetch/mod.rs
pub mod newsapi;
pub mod tech_review;
pub mod techcrunch;
pub mod types;
pub mod venturebeat;

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use time::{format_description::well_known::Rfc2822, OffsetDateTime, UtcOffset};

use crate::config::PushConfig;
use crate::fetch::types::ArticleFetcher;

/// Per-source request timeout. A slow source becomes a failure outcome,
/// never a hang in the middle of a run.
pub const FETCH_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

pub(crate) fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .build()
        .context("building http client")
}

/// Strip HTML tags, decode entities, collapse whitespace.
pub fn strip_html(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    static RE_WS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();

    out.trim().to_string()
}

/// Char-aware prefix cap for summaries.
pub fn cap_chars(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        s.chars().take(max).collect()
    } else {
        s.to_string()
    }
}

/// RSS `pubDate` is RFC 2822 ("Mon, 01 Jan 2024 08:00:00 GMT").
pub fn parse_rfc2822_utc(ts: &str) -> Option<DateTime<Utc>> {
    OffsetDateTime::parse(ts, &Rfc2822)
        .ok()
        .map(|dt| dt.to_offset(UtcOffset::UTC).unix_timestamp())
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
}

/// ISO-8601 / RFC 3339, with a lenient fallback for WordPress-style
/// timestamps that omit the offset ("2024-01-01T08:00:00", assumed UTC).
pub fn parse_rfc3339_utc(ts: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(ts) {
        return Some(dt.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .and_then(|naive| Utc.from_local_datetime(&naive).single())
}

/// The production source roster: TechCrunch (WP JSON), MIT Technology Review
/// (HTML), VentureBeat (RSS), and NewsAPI when a key is configured.
pub fn default_fetchers(_cfg: &PushConfig) -> Result<Vec<Box<dyn ArticleFetcher>>> {
    Ok(vec![
        Box::new(techcrunch::TechCrunchFetcher::new()?),
        Box::new(tech_review::TechReviewFetcher::new()?),
        Box::new(venturebeat::VentureBeatFetcher::new()?),
        Box::new(newsapi::NewsApiFetcher::from_env()?),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_html_removes_tags_and_entities() {
        let s = "<p>Hello&nbsp;&amp;  <b>world</b></p>";
        assert_eq!(strip_html(s), "Hello & world");
    }

    #[test]
    fn cap_chars_is_char_aware() {
        assert_eq!(cap_chars("abcdef", 3), "abc");
        assert_eq!(cap_chars("ab", 3), "ab");
        assert_eq!(cap_chars("héllo", 2), "hé");
    }

    #[test]
    fn rfc2822_parses_to_utc() {
        let dt = parse_rfc2822_utc("Mon, 01 Jan 2024 08:00:00 +0000").unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-01-01T08:00:00+00:00");
        assert!(parse_rfc2822_utc("not a date").is_none());
    }

    #[test]
    fn rfc3339_parses_with_and_without_offset() {
        assert!(parse_rfc3339_utc("2024-01-01T08:00:00Z").is_some());
        assert!(parse_rfc3339_utc("2024-01-01T08:00:00+02:00").is_some());
        assert!(parse_rfc3339_utc("2024-01-01T08:00:00").is_some());
        assert!(parse_rfc3339_utc("yesterday").is_none());
    }
}
