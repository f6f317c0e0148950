//! AI News Pusher — Binary Entrypoint
//! Wires the fetch/aggregate/format/dispatch pipeline, spawns the daily
//! scheduler task, and serves the subscription API over Axum.

use std::sync::Arc;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ai_news_pusher::aggregate::Aggregator;
use ai_news_pusher::api::{self, AppState};
use ai_news_pusher::config::PushConfig;
use ai_news_pusher::dispatch;
use ai_news_pusher::fetch;
use ai_news_pusher::metrics::Metrics;
use ai_news_pusher::roster::InMemoryRoster;
use ai_news_pusher::scheduler::PushScheduler;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("ai_news_pusher=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when the file is absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = PushConfig::from_env()?;
    let metrics = Metrics::init();

    let aggregator = Aggregator::new(fetch::default_fetchers(&cfg)?, &cfg);
    let roster = Arc::new(InMemoryRoster::from_env()?);
    let transport = dispatch::transport_from_env()?;

    let scheduler = Arc::new(PushScheduler::new(
        aggregator,
        roster.clone(),
        transport.clone(),
        cfg,
    ));
    scheduler.clone().spawn_daily();

    let app = api::create_router(AppState {
        scheduler,
        roster,
        transport,
    })
    .merge(metrics.router());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!(port, hour = cfg.daily_push_hour, "ai-news-pusher listening");
    axum::serve(listener, app).await?;
    Ok(())
}
