// src/api.rs
//
// Thin HTTP surface over the core pipeline: health, current feed,
// subscription management, manual push, scheduler status.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;

use crate::dispatch::MessageTransport;
use crate::format::DISPLAY_CAP;
use crate::roster::{InMemoryRoster, Recipient};
use crate::scheduler::{PushError, PushScheduler, SchedulerStatus};

#[derive(Clone)]
pub struct AppState {
    pub scheduler: Arc<PushScheduler>,
    pub roster: Arc<InMemoryRoster>,
    pub transport: Arc<dyn MessageTransport>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/news", get(current_news))
        .route("/api/subscribe", post(subscribe))
        .route("/api/unsubscribe", post(unsubscribe))
        .route("/api/subscribers/count", get(subscriber_count))
        .route("/api/push-now", post(push_now))
        .route("/api/scheduler/status", get(scheduler_status))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "timestamp": Utc::now().to_rfc3339() }))
}

/// Read-only view of the aggregated feed; capped tighter than the internal
/// feed and never dispatches anything.
async fn current_news(State(state): State<AppState>) -> Json<Value> {
    let mut feed = state.scheduler.current_feed().await;
    feed.truncate(DISPLAY_CAP);
    Json(json!({ "success": true, "count": feed.len(), "news": feed }))
}

#[derive(serde::Deserialize)]
struct PhoneReq {
    phone: String,
}

async fn subscribe(
    State(state): State<AppState>,
    Json(body): Json<PhoneReq>,
) -> (StatusCode, Json<Value>) {
    let recipient = match Recipient::parse(&body.phone) {
        Ok(r) => r,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "success": false, "error": e.to_string() })),
            );
        }
    };

    if !state.roster.subscribe(recipient.clone()) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "error": "This number is already subscribed" })),
        );
    }

    let welcome = "Welcome to AI News Pusher!\n\nYou'll receive daily AI news updates \
                   every morning. Stay tuned for the latest AI developments!";
    if let Err(e) = state.transport.send_one(&recipient, welcome).await {
        tracing::warn!(error = ?e, recipient = %recipient, "welcome message failed");
    }

    (
        StatusCode::OK,
        Json(json!({ "success": true, "message": "Successfully subscribed to AI news updates" })),
    )
}

async fn unsubscribe(
    State(state): State<AppState>,
    Json(body): Json<PhoneReq>,
) -> (StatusCode, Json<Value>) {
    let Ok(recipient) = Recipient::parse(&body.phone) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "error": "Invalid phone number format" })),
        );
    };

    if state.roster.unsubscribe(&recipient) {
        (
            StatusCode::OK,
            Json(json!({ "success": true, "message": "Successfully unsubscribed" })),
        )
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(json!({ "success": false, "error": "Phone number not found in subscribers" })),
        )
    }
}

async fn subscriber_count(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "count": state.roster.len() }))
}

async fn push_now(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match state.scheduler.trigger_manual().await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(json!({ "success": true, "outcome": outcome })),
        ),
        Err(e @ PushError::AlreadyRunning) => (
            StatusCode::CONFLICT,
            Json(json!({ "success": false, "error": e.to_string() })),
        ),
        Err(PushError::Pipeline(e)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "success": false, "error": e.to_string() })),
        ),
    }
}

async fn scheduler_status(State(state): State<AppState>) -> Json<SchedulerStatus> {
    Json(state.scheduler.status())
}
