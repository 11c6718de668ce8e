//! Prometheus text exposition of a [`MetricsRecorder`].
//!
//! Each render builds a fresh registry from a snapshot, so the recorder stays the
//! single source of truth and nothing is registered globally.

use crate::error::TelemetryError;
use crate::metrics::MetricsRecorder;
use prometheus::{Encoder, GaugeVec, IntCounterVec, Opts, Registry, TextEncoder};

/// Render every provider's counters in the Prometheus text format
///
/// # Errors
/// Returns error if a metric family cannot be built or encoded
pub fn render_prometheus(recorder: &MetricsRecorder) -> Result<String, TelemetryError> {
    let registry = Registry::new();

    let calls = IntCounterVec::new(
        Opts::new("gateway_provider_calls_total", "Provider attempts by outcome"),
        &["provider", "outcome"],
    )?;
    let rate_limits = IntCounterVec::new(
        Opts::new(
            "gateway_provider_rate_limit_hits_total",
            "Attempts throttled by the provider",
        ),
        &["provider"],
    )?;
    let errors = IntCounterVec::new(
        Opts::new("gateway_provider_errors_total", "Failed attempts by error kind"),
        &["provider", "kind"],
    )?;
    let avg_latency = GaugeVec::new(
        Opts::new(
            "gateway_provider_average_response_seconds",
            "Mean attempt latency",
        ),
        &["provider"],
    )?;
    let last_used = GaugeVec::new(
        Opts::new(
            "gateway_provider_last_used_timestamp_seconds",
            "Unix time of the most recent attempt",
        ),
        &["provider"],
    )?;

    registry.register(Box::new(calls.clone()))?;
    registry.register(Box::new(rate_limits.clone()))?;
    registry.register(Box::new(errors.clone()))?;
    registry.register(Box::new(avg_latency.clone()))?;
    registry.register(Box::new(last_used.clone()))?;

    for (provider, m) in recorder.snapshot_all() {
        let provider = provider.as_str();
        calls
            .with_label_values(&[provider, "success"])
            .inc_by(m.successful_calls);
        calls
            .with_label_values(&[provider, "failure"])
            .inc_by(m.failed_calls);
        rate_limits
            .with_label_values(&[provider])
            .inc_by(m.rate_limit_hits);
        for (kind, count) in &m.errors_by_kind {
            errors
                .with_label_values(&[provider, kind.as_str()])
                .inc_by(*count);
        }
        avg_latency
            .with_label_values(&[provider])
            .set(m.average_response_time().as_secs_f64());
        if let Some(ts) = m.last_used {
            last_used
                .with_label_values(&[provider])
                .set(ts.timestamp_millis() as f64 / 1000.0);
        }
    }

    let mut buffer = Vec::new();
    TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|e| TelemetryError::Prometheus(prometheus::Error::Msg(e.to_string())))
}
