//! Error types for the gateway.
//!
//! Two layers of errors exist:
//! - [`ProviderError`]: a single failed attempt against one provider, classified
//!   into an [`ErrorKind`] that drives retry and fallback decisions.
//! - [`GatewayError`]: what a caller of the gateway sees once local remediation
//!   (retries and fallback) is exhausted.

use crate::provider::ProviderIdentity;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Result alias for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Classification of a failed provider attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Provider throttled the request (HTTP 429)
    RateLimited,
    /// Attempt exceeded its time budget
    Timeout,
    /// Connection refused, reset, DNS failure and similar
    TransientNetwork,
    /// Provider answered with a 5xx status
    ServerError5xx,
    /// Credential rejected or could not be acquired
    AuthenticationFailure,
    /// Request rejected as malformed or unacceptable
    InvalidRequest,
    /// Anything that does not fit the other kinds
    Unknown,
}

impl ErrorKind {
    /// Every kind, in declaration order
    pub const ALL: [Self; 7] = [
        Self::RateLimited,
        Self::Timeout,
        Self::TransientNetwork,
        Self::ServerError5xx,
        Self::AuthenticationFailure,
        Self::InvalidRequest,
        Self::Unknown,
    ];

    /// Kinds that are retried unless configured otherwise
    pub const DEFAULT_RETRYABLE: [Self; 4] = [
        Self::RateLimited,
        Self::Timeout,
        Self::TransientNetwork,
        Self::ServerError5xx,
    ];

    /// Stable snake_case name, used in logs, metrics labels and configuration
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RateLimited => "rate_limited",
            Self::Timeout => "timeout",
            Self::TransientNetwork => "transient_network",
            Self::ServerError5xx => "server_error_5xx",
            Self::AuthenticationFailure => "authentication_failure",
            Self::InvalidRequest => "invalid_request",
            Self::Unknown => "unknown",
        }
    }

    /// Whether this kind is in the default retryable set
    #[must_use]
    pub fn is_retryable_by_default(self) -> bool {
        Self::DEFAULT_RETRYABLE.contains(&self)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| format!("unknown error kind '{s}'"))
    }
}

/// A classified failure of one attempt against one provider
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ProviderError {
    /// Classification driving retry and fallback
    pub kind: ErrorKind,
    /// Human readable detail
    pub message: String,
    /// HTTP status code, when the failure came from a response
    pub status_code: Option<u16>,
    /// Server-suggested wait before the next attempt
    pub retry_after: Option<Duration>,
}

impl ProviderError {
    /// Create a new classified error
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status_code: None,
            retry_after: None,
        }
    }

    /// Attach the HTTP status code
    #[must_use]
    pub fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    /// Attach a server-suggested retry delay
    #[must_use]
    pub fn with_retry_after(mut self, retry_after: Option<Duration>) -> Self {
        self.retry_after = retry_after;
        self
    }

    /// Create a rate limit error
    #[must_use]
    pub fn rate_limited(retry_after: Option<Duration>) -> Self {
        Self::new(ErrorKind::RateLimited, "rate limit exceeded")
            .with_status(429)
            .with_retry_after(retry_after)
    }

    /// Create a timeout error for an attempt that ran out of time
    #[must_use]
    pub fn timeout(after: Duration) -> Self {
        Self::new(
            ErrorKind::Timeout,
            format!("no response within {}ms", after.as_millis()),
        )
    }

    /// Create an authentication error
    #[must_use]
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AuthenticationFailure, message)
    }

    /// Whether this failure was a throttling response
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        self.kind == ErrorKind::RateLimited
    }
}

/// Last observed failure for one provider in a candidate list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderFailure {
    /// Provider that was attempted
    pub provider: ProviderIdentity,
    /// Attempts made against this provider
    pub attempts: u32,
    /// Error from the final attempt
    pub last_error: ProviderError,
}

impl fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} attempt{}): {}",
            self.provider,
            self.attempts,
            if self.attempts == 1 { "" } else { "s" },
            self.last_error
        )
    }
}

/// Why a request was abandoned before a terminal provider outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The caller's cancellation token fired
    Signal,
    /// The request-level deadline elapsed
    Deadline,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signal => write!(f, "cancelled by caller"),
            Self::Deadline => write!(f, "deadline exceeded"),
        }
    }
}

/// Coarse classification of a [`GatewayError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayErrorKind {
    /// Caller misuse, never retried or failed over
    InvalidRequest,
    /// A provider was requested that is not in the registry
    UnconfiguredProvider,
    /// Configuration could not be loaded or validated
    Configuration,
    /// Every candidate provider was exhausted
    AllProvidersFailed,
    /// The caller cancelled or the deadline elapsed
    Cancelled,
}

/// Error surfaced to callers of the gateway
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// Messages failed local validation
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// What was wrong with the request
        message: String,
    },

    /// Provider lookup failed
    #[error("Provider '{provider}' is not configured")]
    UnconfiguredProvider {
        /// The provider that was looked up
        provider: ProviderIdentity,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Configuration {
        /// Error message
        message: String,
    },

    /// No candidate provider produced a response
    #[error("All providers failed after {attempts} attempts: {}", join_failures(.failures))]
    AllProvidersFailed {
        /// Total attempts across all providers
        attempts: u32,
        /// Last error per attempted provider, in candidate order
        failures: Vec<ProviderFailure>,
    },

    /// The request was abandoned
    #[error("Request {reason} after {attempts} attempts")]
    Cancelled {
        /// Cancellation cause
        reason: CancelReason,
        /// Attempts started before cancellation
        attempts: u32,
        /// Failures observed before cancellation
        failures: Vec<ProviderFailure>,
    },
}

fn join_failures(failures: &[ProviderFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl GatewayError {
    /// Create an invalid request error
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Coarse error classification
    #[must_use]
    pub fn kind(&self) -> GatewayErrorKind {
        match self {
            Self::InvalidRequest { .. } => GatewayErrorKind::InvalidRequest,
            Self::UnconfiguredProvider { .. } => GatewayErrorKind::UnconfiguredProvider,
            Self::Configuration { .. } => GatewayErrorKind::Configuration,
            Self::AllProvidersFailed { .. } => GatewayErrorKind::AllProvidersFailed,
            Self::Cancelled { .. } => GatewayErrorKind::Cancelled,
        }
    }

    /// Total provider attempts made before this error was returned
    #[must_use]
    pub fn attempts(&self) -> u32 {
        match self {
            Self::AllProvidersFailed { attempts, .. } | Self::Cancelled { attempts, .. } => {
                *attempts
            }
            _ => 0,
        }
    }

    /// Per-provider diagnostics, empty for errors raised before any attempt
    #[must_use]
    pub fn failures(&self) -> &[ProviderFailure] {
        match self {
            Self::AllProvidersFailed { failures, .. } | Self::Cancelled { failures, .. } => {
                failures
            }
            _ => &[],
        }
    }

    /// Error of the last attempt against the last provider tried
    #[must_use]
    pub fn last_error(&self) -> Option<&ProviderError> {
        self.failures().last().map(|f| &f.last_error)
    }
}
