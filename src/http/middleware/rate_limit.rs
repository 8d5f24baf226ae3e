//! Per-route rate limiting middleware.

use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::config::schema::ROUTE_INVESTOR_INVESTMENT;
use crate::http::request::ClientIdentity;
use crate::http::response::{insert_rate_limit_headers, ApiError};
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::security::extract_identifier;

/// Middleware state: shared app state plus the route being guarded.
#[derive(Clone)]
pub struct RouteGuard {
    pub state: AppState,
    pub route: &'static str,
}

impl RouteGuard {
    pub fn new(state: &AppState, route: &'static str) -> Self {
        Self {
            state: state.clone(),
            route,
        }
    }
}

/// Error text for a 429 on `route`.
pub fn denial_message(route: &str) -> &'static str {
    match route {
        ROUTE_INVESTOR_INVESTMENT => {
            "Too many requests. Please try again later or contact us directly."
        }
        _ => "Too many requests. Please try again later.",
    }
}

/// Resolve the client, count the request against the route's policy, and
/// either reject with 429 or run the handler and annotate its response.
pub async fn rate_limit_middleware(
    State(guard): State<RouteGuard>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let start = Instant::now();
    let route = guard.route;
    let client = extract_identifier(request.headers());
    request.extensions_mut().insert(ClientIdentity(client.clone()));

    let limits = guard.state.limits.load_full();
    if !limits.enabled {
        let response = next.run(request).await;
        metrics::record_request(route, response.status().as_u16(), start);
        return response;
    }

    let policy = limits.policy(route);
    let key = format!("{route}:{client}");
    let decision = match guard.state.limiter.check(&key, policy.limit, policy.window()) {
        Ok(decision) => decision,
        Err(e) => {
            tracing::error!(route, error = %e, "Rate limit policy rejected by limiter");
            metrics::record_request(route, 500, start);
            return ApiError::Internal("Rate limiting unavailable").into_response();
        }
    };

    if !decision.allowed {
        let retry_after = decision.retry_after(guard.state.limiter.now_ms());
        tracing::warn!(
            route,
            client = %client,
            limit = decision.limit,
            retry_after_secs = retry_after.as_secs(),
            "Rate limit exceeded"
        );
        metrics::record_rate_limited(route);
        metrics::record_request(route, StatusCode::TOO_MANY_REQUESTS.as_u16(), start);

        let mut response = (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "error": denial_message(route) })),
        )
            .into_response();
        let headers = response.headers_mut();
        insert_rate_limit_headers(headers, &decision);
        headers.insert(header::RETRY_AFTER, HeaderValue::from(retry_after.as_secs()));
        return response;
    }

    let mut response = next.run(request).await;
    insert_rate_limit_headers(response.headers_mut(), &decision);
    metrics::record_request(route, response.status().as_u16(), start);
    response
}
