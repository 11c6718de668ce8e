//! Per-provider configuration.

use crate::error::ConfigError;
use gateway_core::ProviderIdentity;
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use url::Url;

/// Default endpoint of a local OpenAI-compatible inference server
pub const SELF_HOSTED_DEFAULT_ENDPOINT: &str = "http://localhost:11434";

/// Key in [`ProviderConfig::extra`] holding the REST API version
pub const EXTRA_API_VERSION: &str = "api_version";

/// How the gateway authenticates to a provider
#[derive(Debug, Clone)]
pub enum Credential {
    /// Static secret sent with every request
    ApiKey(SecretString),
    /// Short-lived bearer token fetched from a managed identity endpoint
    ManagedIdentity {
        /// Client ID of a user-assigned identity; system-assigned when absent
        client_id: Option<String>,
        /// Token endpoint override; the platform default when absent
        token_endpoint: Option<Url>,
    },
    /// No credential, for unauthenticated local servers
    None,
}

impl Credential {
    /// Wrap a static API key
    #[must_use]
    pub fn api_key(key: impl Into<String>) -> Self {
        Self::ApiKey(SecretString::new(key.into()))
    }

    /// System-assigned managed identity at the platform default endpoint
    #[must_use]
    pub fn managed_identity() -> Self {
        Self::ManagedIdentity {
            client_id: None,
            token_endpoint: None,
        }
    }

    /// Name of the mode, as written in configuration
    #[must_use]
    pub fn mode(&self) -> &'static str {
        match self {
            Self::ApiKey(_) => "api-key",
            Self::ManagedIdentity { .. } => "managed-identity",
            Self::None => "none",
        }
    }
}

/// Everything needed to reach one provider
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Which provider this is
    pub identity: ProviderIdentity,
    /// Base URL; optional only where a well-known default exists
    pub endpoint: Option<Url>,
    /// Active credential mode
    pub credential: Credential,
    /// Azure deployment name or model name
    pub deployment_or_model: String,
    /// Provider-specific settings such as the API version
    pub extra: HashMap<String, String>,
}

impl ProviderConfig {
    /// Create a config with no endpoint and no extras
    #[must_use]
    pub fn new(
        identity: ProviderIdentity,
        credential: Credential,
        deployment_or_model: impl Into<String>,
    ) -> Self {
        Self {
            identity,
            endpoint: None,
            credential,
            deployment_or_model: deployment_or_model.into(),
            extra: HashMap::new(),
        }
    }

    /// Set the endpoint
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: Url) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    /// Add a provider-specific setting
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Endpoint to call, falling back to the provider's well-known default
    ///
    /// # Errors
    /// Returns error if no endpoint is set and the provider has no default
    pub fn resolved_endpoint(&self) -> Result<Url, ConfigError> {
        if let Some(endpoint) = &self.endpoint {
            return Ok(endpoint.clone());
        }
        match default_endpoint(self.identity) {
            Some(default) => Url::parse(default).map_err(|e| {
                ConfigError::provider(self.identity, format!("bad default endpoint: {e}"))
            }),
            None => Err(ConfigError::provider(self.identity, "endpoint is required")),
        }
    }

    /// Look up a provider-specific setting
    #[must_use]
    pub fn extra(&self, key: &str) -> Option<&str> {
        self.extra.get(key).map(String::as_str)
    }

    /// Check the config's invariants
    ///
    /// # Errors
    /// Returns `ConfigError::Provider` naming the first violation
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.resolved_endpoint()?;

        if self.deployment_or_model.trim().is_empty() {
            return Err(ConfigError::provider(
                self.identity,
                "deployment or model name is required",
            ));
        }

        match &self.credential {
            Credential::ApiKey(key) if key.expose_secret().trim().is_empty() => Err(
                ConfigError::provider(self.identity, "api key must not be empty"),
            ),
            Credential::None if self.identity != ProviderIdentity::SelfHosted => Err(
                ConfigError::provider(self.identity, "a credential is required"),
            ),
            _ => Ok(()),
        }
    }
}

/// Well-known endpoint for providers that have one
#[must_use]
pub fn default_endpoint(identity: ProviderIdentity) -> Option<&'static str> {
    match identity {
        ProviderIdentity::SelfHosted => Some(SELF_HOSTED_DEFAULT_ENDPOINT),
        ProviderIdentity::AzureOpenAi | ProviderIdentity::AzureAiStudio => None,
    }
}
