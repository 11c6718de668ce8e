//! Environment-style configuration loading.
//!
//! Settings are read once at process start. Only providers named as primary or
//! fallback are loaded, so credentials for unused providers may be absent.

use crate::error::ConfigError;
use crate::provider::{Credential, ProviderConfig, EXTRA_API_VERSION};
use crate::registry::ProviderRegistry;
use gateway_core::{ErrorKind, ProviderIdentity};
use gateway_resilience::{RetryConfig, DEFAULT_MAX_CONCURRENT};
use secrecy::SecretString;
use std::collections::{BTreeSet, HashMap};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Primary provider identity
pub const PRIMARY_PROVIDER: &str = "GATEWAY_PRIMARY_PROVIDER";
/// Comma-separated fallback identities
pub const FALLBACK_PROVIDERS: &str = "GATEWAY_FALLBACK_PROVIDERS";
/// Retries per provider
pub const MAX_RETRIES: &str = "GATEWAY_MAX_RETRIES";
/// Delay before the first retry
pub const RETRY_BASE_DELAY_MS: &str = "GATEWAY_RETRY_BASE_DELAY_MS";
/// Upper bound on retry delay
pub const RETRY_MAX_DELAY_MS: &str = "GATEWAY_RETRY_MAX_DELAY_MS";
/// Backoff multiplier
pub const RETRY_MULTIPLIER: &str = "GATEWAY_RETRY_MULTIPLIER";
/// Subtractive jitter fraction
pub const RETRY_JITTER: &str = "GATEWAY_RETRY_JITTER";
/// Comma-separated retryable error kinds
pub const RETRYABLE_ERRORS: &str = "GATEWAY_RETRYABLE_ERRORS";
/// Per-attempt timeout
pub const ATTEMPT_TIMEOUT_MS: &str = "GATEWAY_ATTEMPT_TIMEOUT_MS";
/// Local in-flight cap per provider
pub const MAX_CONCURRENCY_PER_PROVIDER: &str = "GATEWAY_MAX_CONCURRENCY_PER_PROVIDER";

/// Default per-attempt timeout
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(60);

/// Fully loaded gateway configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Configured providers in candidate order
    pub registry: ProviderRegistry,
    /// Retry tuning
    pub retry: RetryConfig,
    /// Time budget of a single transport call
    pub attempt_timeout: Duration,
    /// Bulkhead size per provider
    pub max_concurrency_per_provider: u32,
}

impl GatewayConfig {
    /// Configuration with default tuning around an existing registry
    #[must_use]
    pub fn new(registry: ProviderRegistry) -> Self {
        Self {
            registry,
            retry: RetryConfig::default(),
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            max_concurrency_per_provider: DEFAULT_MAX_CONCURRENT,
        }
    }

    /// Load from the process environment
    ///
    /// # Errors
    /// Returns error if a required key is missing or any value is invalid
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(std::env::vars())
    }

    /// Load from an explicit set of key/value pairs
    ///
    /// # Errors
    /// Returns error if a required key is missing or any value is invalid
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars = Vars::new(vars);

        let primary: ProviderIdentity = vars.parse_required(PRIMARY_PROVIDER)?;
        let fallbacks = vars.list::<ProviderIdentity>(FALLBACK_PROVIDERS)?;

        let primary = load_provider(&vars, primary)?;
        let fallbacks = fallbacks
            .into_iter()
            .map(|identity| load_provider(&vars, identity))
            .collect::<Result<Vec<_>, _>>()?;
        let registry = ProviderRegistry::new(primary, fallbacks)?;

        let retry = load_retry(&vars)?;

        let attempt_timeout = vars
            .parse::<u64>(ATTEMPT_TIMEOUT_MS)?
            .map_or(DEFAULT_ATTEMPT_TIMEOUT, Duration::from_millis);
        if attempt_timeout.is_zero() {
            return Err(ConfigError::invalid(ATTEMPT_TIMEOUT_MS, "0", "must be positive"));
        }

        let max_concurrency_per_provider = vars
            .parse::<u32>(MAX_CONCURRENCY_PER_PROVIDER)?
            .unwrap_or(DEFAULT_MAX_CONCURRENT);
        if max_concurrency_per_provider == 0 {
            return Err(ConfigError::invalid(
                MAX_CONCURRENCY_PER_PROVIDER,
                "0",
                "must be at least 1",
            ));
        }

        info!(
            primary = %registry.primary().identity,
            fallbacks = registry.fallbacks().len(),
            max_retries = retry.max_retries,
            attempt_timeout_ms = attempt_timeout.as_millis() as u64,
            "Gateway configuration loaded"
        );

        Ok(Self {
            registry,
            retry,
            attempt_timeout,
            max_concurrency_per_provider,
        })
    }
}

fn load_retry(vars: &Vars) -> Result<RetryConfig, ConfigError> {
    let defaults = RetryConfig::default();
    let retryable = match vars.get(RETRYABLE_ERRORS) {
        Some(_) => vars.list::<ErrorKind>(RETRYABLE_ERRORS)?.into_iter().collect(),
        None => defaults.retryable.clone(),
    };

    let config = RetryConfig {
        max_retries: vars.parse(MAX_RETRIES)?.unwrap_or(defaults.max_retries),
        base_delay: vars
            .parse::<u64>(RETRY_BASE_DELAY_MS)?
            .map_or(defaults.base_delay, Duration::from_millis),
        max_delay: vars
            .parse::<u64>(RETRY_MAX_DELAY_MS)?
            .map_or(defaults.max_delay, Duration::from_millis),
        multiplier: vars.parse(RETRY_MULTIPLIER)?.unwrap_or(defaults.multiplier),
        jitter: vars.parse(RETRY_JITTER)?.unwrap_or(defaults.jitter),
        retryable,
    };
    config
        .validate()
        .map_err(|e| ConfigError::Retry(e.to_string()))?;
    Ok(config)
}

fn load_provider(vars: &Vars, identity: ProviderIdentity) -> Result<ProviderConfig, ConfigError> {
    let key = |suffix: &str| format!("{}_{suffix}", identity.env_prefix());

    let endpoint = match vars.get(&key("ENDPOINT")) {
        Some(raw) => Some(
            Url::parse(raw)
                .map_err(|e| ConfigError::invalid(key("ENDPOINT"), raw, e.to_string()))?,
        ),
        None => None,
    };

    let deployment_or_model = vars
        .get(&key("DEPLOYMENT"))
        .or_else(|| vars.get(&key("MODEL")))
        .ok_or_else(|| ConfigError::Missing {
            key: key(match identity {
                ProviderIdentity::AzureOpenAi => "DEPLOYMENT",
                ProviderIdentity::AzureAiStudio | ProviderIdentity::SelfHosted => "MODEL",
            }),
        })?
        .to_string();

    let credential = load_credential(vars, identity, &key)?;

    let mut config = ProviderConfig::new(identity, credential, deployment_or_model);
    config.endpoint = endpoint;
    if let Some(version) = vars.get(&key("API_VERSION")) {
        config = config.with_extra(EXTRA_API_VERSION, version);
    }

    debug!(
        provider = %identity,
        auth_mode = config.credential.mode(),
        deployment = %config.deployment_or_model,
        "Loaded provider configuration"
    );
    Ok(config)
}

fn load_credential(
    vars: &Vars,
    identity: ProviderIdentity,
    key: &dyn Fn(&str) -> String,
) -> Result<Credential, ConfigError> {
    let api_key = vars.get(&key("API_KEY"));
    let mode_key = key("AUTH_MODE");
    let mode = match vars.get(&mode_key) {
        Some(raw) => AuthMode::from_str(raw)
            .map_err(|reason| ConfigError::invalid(&mode_key, raw, reason))?,
        None if identity == ProviderIdentity::SelfHosted && api_key.is_none() => AuthMode::None,
        None => AuthMode::ApiKey,
    };

    match mode {
        AuthMode::ApiKey => {
            let api_key = api_key.ok_or_else(|| ConfigError::Missing { key: key("API_KEY") })?;
            Ok(Credential::ApiKey(SecretString::new(api_key.to_string())))
        }
        AuthMode::ManagedIdentity => {
            let token_key = key("TOKEN_ENDPOINT");
            let token_endpoint = match vars.get(&token_key) {
                Some(raw) => Some(
                    Url::parse(raw)
                        .map_err(|e| ConfigError::invalid(&token_key, raw, e.to_string()))?,
                ),
                None => None,
            };
            Ok(Credential::ManagedIdentity {
                client_id: vars.get(&key("CLIENT_ID")).map(str::to_string),
                token_endpoint,
            })
        }
        AuthMode::None => Ok(Credential::None),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AuthMode {
    ApiKey,
    ManagedIdentity,
    None,
}

impl FromStr for AuthMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "api-key" | "apikey" | "key" => Ok(Self::ApiKey),
            "managed-identity" | "msi" => Ok(Self::ManagedIdentity),
            "none" => Ok(Self::None),
            other => Err(format!(
                "expected api-key, managed-identity or none, got '{other}'"
            )),
        }
    }
}

/// Snapshot of the key/value source with empty values treated as unset
struct Vars(HashMap<String, String>);

impl Vars {
    fn new<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self(
            vars.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    fn parse<T>(&self, key: &str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr,
        T::Err: ToString,
    {
        self.get(key)
            .map(|raw| {
                raw.parse::<T>()
                    .map_err(|e| ConfigError::invalid(key, raw, e.to_string()))
            })
            .transpose()
    }

    fn parse_required<T>(&self, key: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: ToString,
    {
        self.parse(key)?.ok_or_else(|| ConfigError::Missing {
            key: key.to_string(),
        })
    }

    fn list<T>(&self, key: &str) -> Result<Vec<T>, ConfigError>
    where
        T: FromStr + Ord + Copy,
        T::Err: ToString,
    {
        let Some(raw) = self.get(key) else {
            return Ok(Vec::new());
        };
        let mut seen = BTreeSet::new();
        let mut items = Vec::new();
        for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let item = part
                .parse::<T>()
                .map_err(|e| ConfigError::invalid(key, part, e.to_string()))?;
            if seen.insert(item) {
                items.push(item);
            }
        }
        Ok(items)
    }
}
