/**
 * Upgrade Request Checks
 *
 * Helpers that read the WebSocket upgrade request before any identity call:
 * where the credential comes from, and whether the request's `Origin` is
 * one the service accepts.
 */

use axum::http::{
    header::{AUTHORIZATION, ORIGIN},
    HeaderMap,
};

/// Extract the credential carried by an upgrade request
///
/// Browsers cannot set headers on a WebSocket handshake, so the `token`
/// query parameter wins; `Authorization: Bearer <token>` is the fallback.
/// Empty values count as absent.
pub fn extract_credential<'a>(headers: &'a HeaderMap, query_token: Option<&'a str>) -> Option<&'a str> {
    if let Some(token) = query_token.map(str::trim).filter(|t| !t.is_empty()) {
        return Some(token);
    }

    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Whether the request's `Origin` header is acceptable
///
/// Requests without an `Origin` (non-browser clients) are allowed. A header
/// that is present must match an allow-list entry exactly.
pub fn origin_allowed(headers: &HeaderMap, allowed: &[String]) -> bool {
    match headers.get(ORIGIN) {
        None => true,
        Some(origin) => match origin.to_str() {
            Ok(origin) => allowed.iter().any(|a| a == origin),
            Err(_) => false,
        },
    }
}
