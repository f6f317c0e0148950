// src/scheduler.rs
//
// Orchestrates the daily pipeline: aggregate -> format -> dispatch. A single
// run may be in flight at any time; the timer and the manual trigger share
// one guard. The timer silently skips when busy, the manual trigger reports
// the conflict to its caller.

use chrono::{DateTime, Days, Duration, Local, TimeZone, Utc};
use metrics::{counter, gauge};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tokio::task::JoinHandle;

use crate::aggregate::Aggregator;
use crate::config::PushConfig;
use crate::dispatch::{self, DispatchOutcome, MessageTransport};
use crate::fetch::types::Article;
use crate::format;
use crate::roster::RosterProvider;

#[derive(Debug, thiserror::Error)]
pub enum PushError {
    /// A manual trigger arrived while a run was in flight. Never queued;
    /// the caller is expected to retry later.
    #[error("push already in progress")]
    AlreadyRunning,
    /// Any fault inside the run sequence, surfaced to manual callers only.
    #[error(transparent)]
    Pipeline(#[from] anyhow::Error),
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SchedulerStatus {
    pub is_running: bool,
    pub last_run_at: Option<DateTime<Utc>>,
    pub next_run_at: DateTime<Utc>,
}

pub struct PushScheduler {
    aggregator: Aggregator,
    roster: Arc<dyn RosterProvider>,
    transport: Arc<dyn MessageTransport>,
    cfg: PushConfig,
    is_running: AtomicBool,
    last_run_at: RwLock<Option<DateTime<Utc>>>,
}

/// Releases the single-flight guard when dropped, so every exit path of a
/// run, including faults, returns the scheduler to idle.
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl PushScheduler {
    pub fn new(
        aggregator: Aggregator,
        roster: Arc<dyn RosterProvider>,
        transport: Arc<dyn MessageTransport>,
        cfg: PushConfig,
    ) -> Self {
        Self {
            aggregator,
            roster,
            transport,
            cfg,
            is_running: AtomicBool::new(false),
            last_run_at: RwLock::new(None),
        }
    }

    fn try_acquire(&self) -> Option<RunGuard<'_>> {
        self.is_running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunGuard(&self.is_running))
    }

    /// Manual trigger. Fails fast with `AlreadyRunning` when a run is in
    /// flight and surfaces pipeline faults to the caller.
    pub async fn trigger_manual(&self) -> Result<DispatchOutcome, PushError> {
        let _guard = self.try_acquire().ok_or(PushError::AlreadyRunning)?;
        tracing::info!("manual push triggered");
        let outcome = self.run_pipeline().await?;
        Ok(outcome)
    }

    /// Timer trigger. A busy guard means this fire is skipped outright (the
    /// next opportunity is tomorrow); faults are logged, not propagated.
    pub async fn timer_fire(&self) {
        let Some(_guard) = self.try_acquire() else {
            tracing::warn!("push already in progress, skipping scheduled fire");
            counter!("push_skipped_total").increment(1);
            return;
        };
        tracing::info!("scheduled push triggered");
        if let Err(e) = self.run_pipeline().await {
            tracing::error!(error = ?e, "scheduled push failed");
        }
    }

    async fn run_pipeline(&self) -> anyhow::Result<DispatchOutcome> {
        counter!("push_runs_total").increment(1);
        let started = std::time::Instant::now();
        let now = Utc::now();

        let feed = self.aggregator.fetch_all(now).await;
        if feed.is_empty() {
            tracing::info!("no articles in window, nothing to push");
            self.record_completion(Utc::now());
            return Ok(DispatchOutcome::default());
        }

        let body = format::render(&feed, now, self.cfg.recency_window_hours);
        let recipients = self.roster.current_recipients().await?;
        let outcome = dispatch::send_all(
            self.transport.as_ref(),
            &recipients,
            &body,
            self.cfg.batch_size,
            std::time::Duration::from_millis(self.cfg.batch_delay_ms),
        )
        .await;

        self.record_completion(Utc::now());
        tracing::info!(
            articles = feed.len(),
            succeeded = outcome.succeeded,
            failed = outcome.failed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "push completed"
        );
        Ok(outcome)
    }

    fn record_completion(&self, at: DateTime<Utc>) {
        *self.last_run_at.write().expect("rwlock poisoned") = Some(at);
        gauge!("push_last_run_ts").set(at.timestamp() as f64);
    }

    /// Read-only fetch of the current feed; does not dispatch anything.
    pub async fn current_feed(&self) -> Vec<Article> {
        self.aggregator.fetch_all(Utc::now()).await
    }

    pub fn status(&self) -> SchedulerStatus {
        SchedulerStatus {
            is_running: self.is_running.load(Ordering::Acquire),
            last_run_at: *self.last_run_at.read().expect("rwlock poisoned"),
            next_run_at: next_run_at(Local::now(), self.cfg.daily_push_hour).with_timezone(&Utc),
        }
    }

    /// Background task firing once per calendar day at the configured local
    /// hour. Runs for the process lifetime.
    pub fn spawn_daily(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let now = Local::now();
                let next = next_run_at(now, self.cfg.daily_push_hour);
                tracing::info!(next = %next.to_rfc3339(), "daily push scheduled");

                let wait = (next - now).to_std().unwrap_or_default();
                tokio::time::sleep(wait).await;
                self.timer_fire().await;
            }
        })
    }
}

/// Next occurrence of `hour`:00 strictly after `now`, in `now`'s timezone.
pub fn next_run_at<Tz: TimeZone>(now: DateTime<Tz>, hour: u32) -> DateTime<Tz> {
    let tz = now.timezone();
    for days_ahead in 0..3 {
        let Some(day) = now.date_naive().checked_add_days(Days::new(days_ahead)) else {
            continue;
        };
        let Some(naive) = day.and_hms_opt(hour.min(23), 0, 0) else {
            continue;
        };
        // `earliest` picks the first valid instant around DST transitions
        if let Some(candidate) = tz.from_local_datetime(&naive).earliest() {
            if candidate > now {
                return candidate;
            }
        }
    }
    // unreachable in practice; keeps the function total
    now + Duration::hours(24)
}
