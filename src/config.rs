// src/config.rs
use anyhow::{bail, Context, Result};

/// Pipeline tuning knobs, loaded from the environment with sane defaults.
#[derive(Debug, Clone, Copy)]
pub struct PushConfig {
    /// Local wall-clock hour of the daily push (0-23).
    pub daily_push_hour: u32,
    /// Recipients per outbound batch.
    pub batch_size: usize,
    /// Delay between consecutive batches.
    pub batch_delay_ms: u64,
    /// Trailing window an article must fall into to be eligible.
    pub recency_window_hours: i64,
    /// Internal feed cap after merge/sort/dedup.
    pub max_articles: usize,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            daily_push_hour: 8,
            batch_size: 10,
            batch_delay_ms: 1_000,
            recency_window_hours: 24,
            max_articles: 20,
        }
    }
}

impl PushConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let cfg = Self {
            daily_push_hour: env_parse("DAILY_PUSH_HOUR", defaults.daily_push_hour)?,
            batch_size: env_parse("PUSH_BATCH_SIZE", defaults.batch_size)?,
            batch_delay_ms: env_parse("PUSH_BATCH_DELAY_MS", defaults.batch_delay_ms)?,
            recency_window_hours: env_parse("RECENCY_WINDOW_HOURS", defaults.recency_window_hours)?,
            max_articles: env_parse("MAX_ARTICLES", defaults.max_articles)?,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.daily_push_hour > 23 {
            bail!("DAILY_PUSH_HOUR must be 0-23, got {}", self.daily_push_hour);
        }
        if self.batch_size == 0 {
            bail!("PUSH_BATCH_SIZE must be positive");
        }
        if self.recency_window_hours <= 0 {
            bail!("RECENCY_WINDOW_HOURS must be positive");
        }
        if self.max_articles == 0 {
            bail!("MAX_ARTICLES must be positive");
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("parsing {key}='{raw}'")),
        Err(_) => Ok(default),
    }
}
