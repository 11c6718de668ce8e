//! Immutable registry of configured providers.

use crate::error::ConfigError;
use crate::provider::ProviderConfig;
use gateway_core::{GatewayError, ProviderIdentity};
use std::collections::BTreeSet;
use std::iter;

/// The primary provider and its ordered fallbacks.
///
/// Built once at startup; there is no mutation API.
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    primary: ProviderConfig,
    fallbacks: Vec<ProviderConfig>,
}

impl ProviderRegistry {
    /// Validate and assemble a registry
    ///
    /// # Errors
    /// Returns error if any config is invalid or an identity repeats
    pub fn new(
        primary: ProviderConfig,
        fallbacks: Vec<ProviderConfig>,
    ) -> Result<Self, ConfigError> {
        let mut seen = BTreeSet::new();
        for config in iter::once(&primary).chain(&fallbacks) {
            config.validate()?;
            if !seen.insert(config.identity) {
                return Err(ConfigError::DuplicateProvider(config.identity));
            }
        }
        Ok(Self { primary, fallbacks })
    }

    /// Registry with a single provider
    ///
    /// # Errors
    /// Returns error if the config is invalid
    pub fn single(primary: ProviderConfig) -> Result<Self, ConfigError> {
        Self::new(primary, Vec::new())
    }

    /// Config for `identity`
    ///
    /// # Errors
    /// Returns `GatewayError::UnconfiguredProvider` if the provider is not registered
    pub fn resolve(&self, identity: ProviderIdentity) -> Result<&ProviderConfig, GatewayError> {
        self.candidates()
            .find(|config| config.identity == identity)
            .ok_or(GatewayError::UnconfiguredProvider { provider: identity })
    }

    /// The provider tried first
    #[must_use]
    pub fn primary(&self) -> &ProviderConfig {
        &self.primary
    }

    /// Providers tried after the primary, in configuration order
    #[must_use]
    pub fn fallbacks(&self) -> &[ProviderConfig] {
        &self.fallbacks
    }

    /// Primary followed by fallbacks
    pub fn candidates(&self) -> impl Iterator<Item = &ProviderConfig> {
        iter::once(&self.primary).chain(&self.fallbacks)
    }

    /// Number of configured providers, at least one
    #[must_use]
    pub fn len(&self) -> usize {
        1 + self.fallbacks.len()
    }

    /// Always false; a registry holds at least its primary
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }
}
