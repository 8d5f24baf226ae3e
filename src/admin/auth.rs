use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::Response,
};

/// Require `Authorization: Bearer <api_key>`.
pub async fn admin_auth_middleware(
    State(api_key): State<Arc<str>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match token {
        Some(token) if !api_key.is_empty() && token == &*api_key => Ok(next.run(request).await),
        _ => {
            tracing::warn!("Rejected admin request with missing or invalid key");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}
