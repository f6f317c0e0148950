// src/metrics.rs
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder and register the pipeline series so
    /// they show up on /metrics before the first push runs.
    pub fn init() -> Self {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .expect("prometheus: install recorder");

        describe_counter!("fetch_articles_total", "Articles parsed from sources.");
        describe_counter!("fetch_source_errors_total", "Source fetch/parse failures.");
        describe_counter!(
            "push_runs_total",
            "Pipeline runs started (timer or manual)."
        );
        describe_counter!(
            "push_skipped_total",
            "Timer fires skipped by the single-flight guard."
        );
        describe_counter!("push_sent_total", "Messages delivered successfully.");
        describe_counter!("push_send_failures_total", "Per-recipient send failures.");
        describe_gauge!("push_last_run_ts", "Unix ts of the last completed push run.");

        Self { handle }
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
