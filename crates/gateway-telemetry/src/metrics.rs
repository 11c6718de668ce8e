//! Per-provider call metrics.
//!
//! One [`ProviderMetrics`] record exists per provider, created lazily on first use
//! and kept for the process lifetime. Each record is mutated under its map shard's
//! write lock, so every field of a record changes together and a snapshot never
//! observes a half-applied update.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use gateway_core::{ErrorKind, ProviderIdentity};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tracing::trace;

/// Result of one provider attempt, as reported to the recorder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallOutcome {
    /// Whether the attempt produced a response
    pub success: bool,
    /// Wall time spent on the attempt
    pub elapsed: Duration,
    /// Classification of a failed attempt
    pub error_kind: Option<ErrorKind>,
    /// Whether the provider throttled the attempt
    pub rate_limited: bool,
}

impl CallOutcome {
    /// A successful attempt
    #[must_use]
    pub fn success(elapsed: Duration) -> Self {
        Self {
            success: true,
            elapsed,
            error_kind: None,
            rate_limited: false,
        }
    }

    /// A failed attempt of the given kind
    #[must_use]
    pub fn failure(kind: ErrorKind, elapsed: Duration) -> Self {
        Self {
            success: false,
            elapsed,
            error_kind: Some(kind),
            rate_limited: kind == ErrorKind::RateLimited,
        }
    }
}

/// Accumulated counters for one provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProviderMetrics {
    /// Attempts recorded
    pub total_calls: u64,
    /// Attempts that produced a response
    pub successful_calls: u64,
    /// Attempts that failed
    pub failed_calls: u64,
    /// Sum of attempt latencies
    pub total_response_time: Duration,
    /// When the provider was last attempted
    pub last_used: Option<DateTime<Utc>>,
    /// Attempts the provider throttled
    pub rate_limit_hits: u64,
    /// Failed attempts per error kind
    pub errors_by_kind: BTreeMap<ErrorKind, u64>,
}

impl ProviderMetrics {
    /// Mean attempt latency, zero before the first call
    #[must_use]
    pub fn average_response_time(&self) -> Duration {
        if self.total_calls == 0 {
            return Duration::ZERO;
        }
        let nanos = self.total_response_time.as_nanos() / u128::from(self.total_calls);
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    /// Fraction of attempts that succeeded, zero before the first call
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        if self.total_calls == 0 {
            0.0
        } else {
            self.successful_calls as f64 / self.total_calls as f64
        }
    }

    fn apply(&mut self, outcome: &CallOutcome) {
        self.total_calls += 1;
        self.total_response_time += outcome.elapsed;
        self.last_used = Some(Utc::now());

        if outcome.success {
            self.successful_calls += 1;
        } else {
            self.failed_calls += 1;
            let kind = outcome.error_kind.unwrap_or(ErrorKind::Unknown);
            *self.errors_by_kind.entry(kind).or_insert(0) += 1;
        }

        if outcome.rate_limited {
            self.rate_limit_hits += 1;
        }
    }
}

/// Process-wide metrics keyed by provider
#[derive(Debug, Default)]
pub struct MetricsRecorder {
    providers: DashMap<ProviderIdentity, ProviderMetrics>,
}

impl MetricsRecorder {
    /// Create an empty recorder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one attempt into the provider's record
    pub fn record(&self, provider: ProviderIdentity, outcome: CallOutcome) {
        let mut entry = self.providers.entry(provider).or_default();
        entry.apply(&outcome);
        trace!(
            provider = %provider,
            success = outcome.success,
            elapsed_ms = outcome.elapsed.as_millis() as u64,
            total_calls = entry.total_calls,
            "Recorded provider attempt"
        );
    }

    /// Copy of one provider's record, `None` if it was never attempted
    #[must_use]
    pub fn snapshot(&self, provider: ProviderIdentity) -> Option<ProviderMetrics> {
        self.providers.get(&provider).map(|m| m.value().clone())
    }

    /// Copy of every provider's record
    #[must_use]
    pub fn snapshot_all(&self) -> HashMap<ProviderIdentity, ProviderMetrics> {
        self.providers
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect()
    }
}
