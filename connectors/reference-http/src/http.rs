//! Shared reqwest client construction and response classification.

use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;
use starsync_sdk::prelude::*;

const BODY_SNIPPET_CHARS: usize = 200;

pub(crate) fn build_client(timeout_secs: u64) -> Result<reqwest::Client, ConnectorError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(timeout_secs.min(10)))
        .user_agent(concat!("starsync/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ConnectorError::internal("HTTP_CLIENT", e.to_string()))
}

/// Transport-level failure (connect, timeout, body read).
pub(crate) fn request_error(prefix: &str, error: &reqwest::Error) -> ConnectorError {
    let code = if error.is_timeout() {
        "HTTP_TIMEOUT"
    } else if error.is_connect() {
        "HTTP_CONNECT"
    } else {
        "HTTP_REQUEST"
    };
    ConnectorError::transient_network(code, format!("{prefix}: {error}"))
}

pub(crate) fn retry_after_ms(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(|secs| secs.saturating_mul(1000))
}

/// Non-success HTTP status.
pub(crate) fn status_error(
    prefix: &str,
    status: StatusCode,
    retry_after_ms: Option<u64>,
    body: &str,
) -> ConnectorError {
    let code = format!("HTTP_{}", status.as_u16());
    let snippet: String = body.trim().chars().take(BODY_SNIPPET_CHARS).collect();
    let message = if snippet.is_empty() {
        format!("{prefix}: status {status}")
    } else {
        format!("{prefix}: status {status}: {snippet}")
    };

    match status.as_u16() {
        429 => ConnectorError::rate_limit(code, message, retry_after_ms),
        408 | 500..=599 => ConnectorError::transient_network(code, message),
        _ => ConnectorError::upstream(code, message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn classify_statuses() {
        let e = status_error("GET", StatusCode::TOO_MANY_REQUESTS, Some(3000), "");
        assert_eq!(e.category, ErrorCategory::RateLimit);
        assert_eq!(e.retry_after_ms, Some(3000));

        let e = status_error("GET", StatusCode::BAD_GATEWAY, None, "upstream down");
        assert_eq!(e.category, ErrorCategory::TransientNetwork);
        assert!(e.message.contains("upstream down"));

        let e = status_error("GET", StatusCode::NOT_FOUND, None, "");
        assert_eq!(e.category, ErrorCategory::Upstream);
        assert_eq!(e.code, "HTTP_404");
        assert!(!e.retryable);
    }

    #[test]
    fn body_snippet_is_truncated() {
        let body = "x".repeat(1000);
        let e = status_error("GET", StatusCode::INTERNAL_SERVER_ERROR, None, &body);
        assert!(e.message.len() < 300);
    }

    #[test]
    fn retry_after_seconds_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(retry_after_ms(&headers), None);
        headers.insert(RETRY_AFTER, HeaderValue::from_static("4"));
        assert_eq!(retry_after_ms(&headers), Some(4000));
        headers.insert(RETRY_AFTER, HeaderValue::from_static("Wed, 21 Oct 2026 07:28:00 GMT"));
        assert_eq!(retry_after_ms(&headers), None);
    }
}
