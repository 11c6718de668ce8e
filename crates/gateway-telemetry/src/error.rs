//! Telemetry error type.

use thiserror::Error;

/// Errors raised while initialising logging or exporting metrics
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The global subscriber could not be installed
    #[error("Failed to initialize logging: {0}")]
    Init(String),

    /// The log filter directive could not be parsed
    #[error("Invalid log filter '{directive}': {message}")]
    Filter {
        /// Directive as supplied
        directive: String,
        /// Parser message
        message: String,
    },

    /// A metric could not be built, registered or encoded
    #[error("Prometheus export failed: {0}")]
    Prometheus(#[from] prometheus::Error),
}
