//! Pulls the connection credential and origin out of an upgrade request.
//!
//! Exactly one source is consulted, as configured by [`CredentialSource`].

use std::collections::HashMap;

use axum::http::{HeaderMap, header};
use axum_extra::extract::cookie::CookieJar;

use relay_core::config::CredentialSource;

/// Reads the credential from the configured source. Blank values count as
/// absent.
pub fn extract_credential(
    source: &CredentialSource,
    headers: &HeaderMap,
    query: &HashMap<String, String>,
) -> Option<String> {
    let raw = match source {
        CredentialSource::Header { name } => headers
            .get(name.as_str())
            .and_then(|v| v.to_str().ok())
            .map(|v| strip_bearer(v).to_string()),
        CredentialSource::Query { name } => query.get(name).cloned(),
        CredentialSource::Cookie { name } => CookieJar::from_headers(headers)
            .get(name)
            .map(|c| c.value().to_string()),
    };

    raw.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Bearer token from the `Authorization` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| strip_bearer(v).trim().to_string())
        .filter(|v| !v.is_empty())
}

/// The `Origin` header, if present and valid UTF-8.
pub fn extract_origin(headers: &HeaderMap) -> Option<&str> {
    headers.get(header::ORIGIN).and_then(|v| v.to_str().ok())
}

fn strip_bearer(value: &str) -> &str {
    let value = value.trim_start();
    match value.get(..7) {
        Some(prefix) if prefix.eq_ignore_ascii_case("bearer ") => &value[7..],
        _ => value,
    }
}
