use std::collections::BTreeMap;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::config::RoutePolicy;
use crate::http::server::AppState;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
}

#[derive(Serialize)]
pub struct RateLimitSummary {
    pub enabled: bool,
    pub tracked_entries: usize,
    pub policies: BTreeMap<String, RoutePolicy>,
}

#[derive(Serialize)]
pub struct SweepResult {
    pub purged: usize,
    pub tracked_entries: usize,
}

pub async fn get_status() -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
    })
}

pub async fn get_rate_limits(State(state): State<AppState>) -> Json<RateLimitSummary> {
    let limits = state.limits.load();
    Json(RateLimitSummary {
        enabled: limits.enabled,
        tracked_entries: state.limiter.tracked(),
        policies: limits.effective_policies(),
    })
}

pub async fn sweep_rate_limits(State(state): State<AppState>) -> Json<SweepResult> {
    let purged = state.limiter.purge_expired();
    let tracked_entries = state.limiter.tracked();
    tracing::info!(purged, tracked_entries, "Manual rate limit sweep");
    Json(SweepResult {
        purged,
        tracked_entries,
    })
}
