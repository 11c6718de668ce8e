//! Mapping of HTTP outcomes onto [`ErrorKind`].

use chrono::{DateTime, Utc};
use gateway_core::{ErrorKind, ProviderError};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

/// Azure sends a millisecond-precision variant alongside `Retry-After`
const RETRY_AFTER_MS: &str = "retry-after-ms";

/// Longest error body excerpt kept in a message
const MAX_BODY_EXCERPT: usize = 512;

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

/// Classify a non-success HTTP response
#[must_use]
pub fn classify_status(status: StatusCode, headers: &HeaderMap, body: &str) -> ProviderError {
    let kind = match status.as_u16() {
        400 | 404 | 413 | 422 => ErrorKind::InvalidRequest,
        401 | 403 => ErrorKind::AuthenticationFailure,
        408 => ErrorKind::Timeout,
        429 => ErrorKind::RateLimited,
        500..=599 => ErrorKind::ServerError5xx,
        _ => ErrorKind::Unknown,
    };

    let retry_after = if kind == ErrorKind::RateLimited {
        parse_retry_after(headers)
    } else {
        None
    };

    ProviderError::new(kind, describe(status, body))
        .with_status(status.as_u16())
        .with_retry_after(retry_after)
}

/// Classify a failure raised by the HTTP client itself
#[must_use]
pub fn classify_transport(err: &reqwest::Error) -> ProviderError {
    let kind = if err.is_timeout() {
        ErrorKind::Timeout
    } else if err.is_decode() {
        ErrorKind::Unknown
    } else if err.is_connect() || err.is_request() || err.is_body() {
        ErrorKind::TransientNetwork
    } else {
        ErrorKind::Unknown
    };

    let error = ProviderError::new(kind, err.to_string());
    match err.status() {
        Some(status) => error.with_status(status.as_u16()),
        None => error,
    }
}

/// Server-suggested wait, from `retry-after-ms`, or `Retry-After` as seconds or an HTTP date
#[must_use]
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    if let Some(ms) = header_str(headers, RETRY_AFTER_MS).and_then(|v| v.parse::<f64>().ok()) {
        if ms.is_finite() && ms >= 0.0 {
            return Some(Duration::from_millis(ms as u64));
        }
    }

    let raw = header_str(headers, RETRY_AFTER.as_str())?;
    if let Ok(secs) = raw.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    let at = DateTime::parse_from_rfc2822(raw).ok()?.with_timezone(&Utc);
    (at - Utc::now()).to_std().ok()
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name)?.to_str().ok().map(str::trim)
}

fn describe(status: StatusCode, body: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        let message = envelope.error.message.unwrap_or_default();
        return match envelope.error.code {
            Some(code) => format!("HTTP {status} ({code}): {message}"),
            None => format!("HTTP {status}: {message}"),
        };
    }

    let body = body.trim();
    if body.is_empty() {
        format!("HTTP {status}")
    } else {
        let excerpt: String = body.chars().take(MAX_BODY_EXCERPT).collect();
        format!("HTTP {status}: {excerpt}")
    }
}
