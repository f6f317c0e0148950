// src/format.rs
//
// Pure rendering of an aggregated feed into one WhatsApp-ready text body.
// No I/O and no failure path: the dispatcher always receives non-empty text.

use chrono::{DateTime, Utc};

use crate::fetch::types::Article;

/// At most this many article blocks are rendered, even when the feed
/// holds more.
pub const DISPLAY_CAP: usize = 10;

const TITLE_CAP: usize = 80;

pub fn render(feed: &[Article], now: DateTime<Utc>, window_hours: i64) -> String {
    if feed.is_empty() {
        return format!(
            "No AI news articles found in the last {window_hours} hours.\n\n\
             Check back tomorrow for the latest updates!"
        );
    }

    let mut message = String::new();
    message.push_str("*Daily AI News Update*\n\n");
    message.push_str(&format!("{}\n", now.format("%A, %B %-d, %Y")));
    message.push_str(&format!(
        "*{} articles from the last {} hours*\n\n",
        feed.len(),
        window_hours
    ));
    message.push_str("_Tip: tap links to read full articles_\n\n");

    for (i, article) in feed.iter().take(DISPLAY_CAP).enumerate() {
        message.push_str(&format!("{}. *{}*\n", i + 1, truncate_title(&article.title)));
        message.push_str(&format!(
            "{} - {}\n",
            article.source,
            relative_age(article.published_at, now)
        ));
        message.push_str(&format!("{}\n\n", article.url));
    }

    message.push_str("---\n");
    message.push_str("*AI News Pusher*\n");
    message.push_str("To unsubscribe, reply STOP or visit the subscription page.");
    message
}

/// "N min ago" under an hour, "N hours ago" under a day, "N day(s) ago"
/// beyond that. `published_at` is never in the future after aggregation.
pub fn relative_age(published_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(published_at);
    let mins = elapsed.num_minutes().max(0);
    if mins < 60 {
        return format!("{mins} min ago");
    }
    let hours = elapsed.num_hours();
    if hours < 24 {
        return format!("{hours} hours ago");
    }
    let days = elapsed.num_days();
    if days == 1 {
        "1 day ago".to_string()
    } else {
        format!("{days} days ago")
    }
}

fn truncate_title(title: &str) -> String {
    if title.chars().count() <= TITLE_CAP {
        return title.to_string();
    }
    let cut: String = title.chars().take(TITLE_CAP - 3).collect();
    format!("{}...", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn article(title: &str, age: Duration, now: DateTime<Utc>) -> Article {
        Article {
            title: title.to_string(),
            summary: None,
            url: "https://example.com/a".to_string(),
            source: "Test".to_string(),
            published_at: now - age,
            image_url: None,
        }
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 6, 9, 0, 0).unwrap()
    }

    #[test]
    fn empty_feed_renders_fixed_message() {
        let out = render(&[], fixed_now(), 24);
        assert!(out.contains("No AI news articles found in the last 24 hours"));
        assert!(!out.is_empty());
    }

    #[test]
    fn renders_header_count_and_blocks() {
        let now = fixed_now();
        let feed = vec![
            article("First", Duration::minutes(5), now),
            article("Second", Duration::hours(3), now),
        ];
        let out = render(&feed, now, 24);
        assert!(out.contains("*2 articles from the last 24 hours*"));
        assert!(out.contains("1. *First*"));
        assert!(out.contains("2. *Second*"));
        assert!(out.contains("Test - 5 min ago"));
        assert!(out.contains("Test - 3 hours ago"));
        assert!(out.contains("https://example.com/a"));
        assert!(out.contains("unsubscribe"));
    }

    #[test]
    fn display_is_capped_at_ten_blocks() {
        let now = fixed_now();
        let feed: Vec<Article> = (0..15)
            .map(|i| article(&format!("T{i}"), Duration::minutes(i), now))
            .collect();
        let out = render(&feed, now, 24);
        assert!(out.contains("10. *T9*"));
        assert!(!out.contains("11. *T10*"));
        // the count still reflects the full feed
        assert!(out.contains("*15 articles"));
    }

    #[test]
    fn long_titles_are_truncated_with_ellipsis() {
        let long = "x".repeat(120);
        let out = truncate_title(&long);
        assert_eq!(out.chars().count(), 80);
        assert!(out.ends_with("..."));
        assert_eq!(truncate_title("short"), "short");
    }

    #[test]
    fn relative_age_breakpoints() {
        let now = fixed_now();
        assert_eq!(relative_age(now, now), "0 min ago");
        assert_eq!(relative_age(now - Duration::minutes(59), now), "59 min ago");
        assert_eq!(relative_age(now - Duration::hours(1), now), "1 hours ago");
        assert_eq!(relative_age(now - Duration::hours(23), now), "23 hours ago");
        assert_eq!(relative_age(now - Duration::hours(25), now), "1 day ago");
        assert_eq!(relative_age(now - Duration::days(3), now), "3 days ago");
    }
}
