//! Shared HTTP utilities for the SmartLink workspace.
//!
//! Response envelopes, public URL building and time formatting used by the
//! api-server. Nothing here depends on a web framework.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::time::SystemTime;

// ============================================================================
// JSON Envelopes (framework-agnostic)
// ============================================================================

/// `{"success": true, "data": <data>}`
pub fn json_success<T: Serialize>(data: &T) -> serde_json::Value {
    serde_json::json!({"success": true, "data": data})
}

/// `{"success": false, "error": "<message>"}`
pub fn json_failure(message: &str) -> serde_json::Value {
    serde_json::json!({"success": false, "error": message})
}

/// Failure envelope with a default message for a well-known error code.
pub fn json_err(code: &str) -> serde_json::Value {
    let message = match code {
        "not_found" => "SmartLink not found",
        "bad_request" => "Bad request",
        "invalid_slug" => "Invalid slug format",
        "invalid_code" => "Invalid short code",
        "conflict" => "SmartLink already exists",
        "error" | "internal" => "Internal server error",
        _ => code,
    };
    json_failure(message)
}

// ============================================================================
// URL Building
// ============================================================================

/// Public short URL for a code: `{domain}/l/{code}`.
///
/// `shortlink_domain` wins when set and non-empty. Otherwise the request host
/// is used (`https://{host}/l/{code}`), or a relative `/l/{code}` when there
/// is no host either.
pub fn build_short_url(shortlink_domain: Option<&str>, host: &str, code: &str) -> String {
    if let Some(dom) = shortlink_domain.map(str::trim).filter(|d| !d.is_empty()) {
        return format!("{}/l/{}", dom.trim_end_matches('/'), code);
    }
    if host.is_empty() {
        format!("/l/{}", code)
    } else {
        format!("https://{}/l/{}", host, code)
    }
}

/// Join a public base URL and an absolute path without doubling slashes.
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

// ============================================================================
// Time Utilities
// ============================================================================

/// Convert SystemTime to RFC3339 string (seconds precision, UTC).
pub fn system_time_to_rfc3339(t: SystemTime) -> String {
    let dt: DateTime<Utc> = t.into();
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}
