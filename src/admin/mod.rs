//! Admin API, served on its own listener.

pub mod auth;
pub mod handlers;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::server::AppState;

pub fn setup_admin_router(state: AppState, api_key: &str) -> Router {
    let api_key: Arc<str> = Arc::from(api_key);
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/rate-limits", get(get_rate_limits))
        .route("/admin/rate-limits/sweep", post(sweep_rate_limits))
        .layer(middleware::from_fn_with_state(api_key, admin_auth_middleware))
        .with_state(state)
}
