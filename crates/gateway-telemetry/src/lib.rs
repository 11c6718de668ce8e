//! # Gateway Telemetry
//!
//! Observability for the document generation gateway.
//!
//! This crate provides:
//! - The per-provider metrics recorder updated after every attempt
//! - Prometheus text export of recorder snapshots
//! - Structured logging initialisation

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod export;
pub mod logging;
pub mod metrics;

// Re-export main types
pub use error::TelemetryError;
pub use export::render_prometheus;
pub use logging::{init_logging, LoggingConfig};
pub use metrics::{CallOutcome, MetricsRecorder, ProviderMetrics};
