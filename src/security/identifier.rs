//! Client identifier extraction for rate limit keys.

use axum::http::HeaderMap;

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
pub const X_REAL_IP: &str = "x-real-ip";
pub const CF_CONNECTING_IP: &str = "cf-connecting-ip";

/// Returned when no header identifies the client.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Best-effort client IP from proxy headers.
///
/// Precedence: first entry of `X-Forwarded-For`, then `X-Real-IP`, then
/// `CF-Connecting-IP`. Empty or non-ASCII values are skipped.
pub fn extract_identifier(headers: &HeaderMap) -> String {
    let forwarded = header_str(headers, X_FORWARDED_FOR)
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    forwarded
        .or_else(|| header_str(headers, X_REAL_IP).map(str::trim).filter(|v| !v.is_empty()))
        .or_else(|| header_str(headers, CF_CONNECTING_IP).map(str::trim).filter(|v| !v.is_empty()))
        .unwrap_or(UNKNOWN_CLIENT)
        .to_string()
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
