use std::sync::atomic::Ordering;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::db::subscription_repo;
use crate::AppState;

/// POST /api/control/pause: pause the mirror poller.
pub async fn pause(State(state): State<AppState>) -> impl IntoResponse {
    state.pause_flag.store(true, Ordering::Relaxed);
    tracing::warn!("Mirror poller PAUSED via control API");
    (StatusCode::OK, Json(json!({ "status": "paused" })))
}

/// POST /api/control/resume: resume the mirror poller.
pub async fn resume(State(state): State<AppState>) -> impl IntoResponse {
    state.pause_flag.store(false, Ordering::Relaxed);
    tracing::info!("Mirror poller RESUMED via control API");
    (StatusCode::OK, Json(json!({ "status": "running" })))
}

/// GET /api/control/status: current system status.
pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let paused = state.pause_flag.load(Ordering::Relaxed);
    let mode = if state.config.mirror_dry_run {
        "dry_run"
    } else {
        "live"
    };

    let enabled_subscriptions = subscription_repo::list_enabled(&state.db)
        .await
        .ok()
        .map(|subs| subs.len());

    Json(json!({
        "mode": mode,
        "paused": paused,
        "mirror_enabled": state.config.mirror_enabled,
        "poll_interval_secs": state.config.poll_interval_secs,
        "enabled_subscriptions": enabled_subscriptions,
    }))
}
