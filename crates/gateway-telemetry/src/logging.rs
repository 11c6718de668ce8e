//! Structured logging setup.

use crate::error::TelemetryError;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of human readable output
    pub json: bool,
    /// Include the event target (module path)
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            with_target: true,
        }
    }
}

impl LoggingConfig {
    /// Create a configuration with the given default level
    #[must_use]
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            ..Default::default()
        }
    }

    /// Switch JSON output on or off
    #[must_use]
    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    /// Include or omit the event target
    #[must_use]
    pub fn with_target(mut self, with_target: bool) -> Self {
        self.with_target = with_target;
        self
    }

    /// Build the filter, preferring `RUST_LOG` over the configured level
    ///
    /// # Errors
    /// Returns error if the configured level is not a valid directive
    pub fn filter(&self) -> Result<EnvFilter, TelemetryError> {
        match EnvFilter::try_from_default_env() {
            Ok(filter) => Ok(filter),
            Err(_) => EnvFilter::try_new(&self.level).map_err(|e| TelemetryError::Filter {
                directive: self.level.clone(),
                message: e.to_string(),
            }),
        }
    }
}

/// Install the global subscriber
///
/// # Errors
/// Returns error if the filter is invalid or a subscriber is already installed
pub fn init_logging(config: &LoggingConfig) -> Result<(), TelemetryError> {
    let filter = config.filter()?;

    let fmt_layer = if config.json {
        fmt::layer()
            .json()
            .with_target(config.with_target)
            .with_current_span(true)
            .boxed()
    } else {
        fmt::layer().with_target(config.with_target).boxed()
    };

    tracing_subscriber::registry()
        .with(fmt_layer.with_filter(filter))
        .try_init()
        .map_err(|e| TelemetryError::Init(e.to_string()))?;

    info!(level = %config.level, json = config.json, "Logging initialized");
    Ok(())
}
