//! Configuration errors.

use gateway_core::{GatewayError, ProviderIdentity};
use thiserror::Error;

/// Errors raised while loading or validating configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A required key is absent or empty
    #[error("missing required setting {key}")]
    Missing {
        /// Environment key
        key: String,
    },

    /// A key holds a value that cannot be used
    #[error("invalid value '{value}' for {key}: {reason}")]
    Invalid {
        /// Environment key
        key: String,
        /// Value as supplied (never a secret)
        value: String,
        /// What is wrong with it
        reason: String,
    },

    /// The same provider appears twice in the candidate list
    #[error("provider {0} is listed more than once")]
    DuplicateProvider(ProviderIdentity),

    /// A provider config violates its own invariants
    #[error("provider {provider}: {message}")]
    Provider {
        /// Offending provider
        provider: ProviderIdentity,
        /// What is wrong
        message: String,
    },

    /// Retry tuning is inconsistent
    #[error("retry policy: {0}")]
    Retry(String),
}

impl ConfigError {
    pub(crate) fn invalid(
        key: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Invalid {
            key: key.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn provider(provider: ProviderIdentity, message: impl Into<String>) -> Self {
        Self::Provider {
            provider,
            message: message.into(),
        }
    }
}

impl From<ConfigError> for GatewayError {
    fn from(err: ConfigError) -> Self {
        Self::configuration(err.to_string())
    }
}
