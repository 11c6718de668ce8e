//! Explicit construction of a [`Gateway`].

use crate::gateway::{Candidate, Gateway};
use gateway_config::{GatewayConfig, DEFAULT_ATTEMPT_TIMEOUT};
use gateway_core::{GatewayError, GatewayResult, ProviderTransport};
use gateway_providers::{build_transports, http_client};
use gateway_resilience::{Bulkhead, RetryPolicy, DEFAULT_MAX_CONCURRENT};
use gateway_telemetry::MetricsRecorder;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Builder for [`Gateway`]
///
/// Transports are tried in the order they are added.
pub struct GatewayBuilder {
    transports: Vec<Arc<dyn ProviderTransport>>,
    retry_policy: Option<RetryPolicy>,
    metrics: Option<Arc<MetricsRecorder>>,
    attempt_timeout: Duration,
    max_concurrency: u32,
}

impl GatewayBuilder {
    /// Create an empty builder
    #[must_use]
    pub fn new() -> Self {
        Self {
            transports: Vec::new(),
            retry_policy: None,
            metrics: None,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            max_concurrency: DEFAULT_MAX_CONCURRENT,
        }
    }

    /// Append a candidate provider
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn ProviderTransport>) -> Self {
        self.transports.push(transport);
        self
    }

    /// Append several candidate providers, in order
    #[must_use]
    pub fn transports(
        mut self,
        transports: impl IntoIterator<Item = Arc<dyn ProviderTransport>>,
    ) -> Self {
        self.transports.extend(transports);
        self
    }

    /// Set the retry policy
    #[must_use]
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    /// Share an existing metrics recorder
    #[must_use]
    pub fn metrics(mut self, recorder: Arc<MetricsRecorder>) -> Self {
        self.metrics = Some(recorder);
        self
    }

    /// Default time budget of one transport call
    #[must_use]
    pub fn attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// In-flight cap per provider
    #[must_use]
    pub fn max_concurrency_per_provider(mut self, max: u32) -> Self {
        self.max_concurrency = max;
        self
    }

    /// Build the gateway
    ///
    /// # Errors
    /// Returns `GatewayError::Configuration` if no provider was added, a provider
    /// appears twice, or a limit is zero
    pub fn build(self) -> GatewayResult<Gateway> {
        if self.transports.is_empty() {
            return Err(GatewayError::configuration(
                "at least one provider must be configured",
            ));
        }
        if self.attempt_timeout.is_zero() {
            return Err(GatewayError::configuration(
                "attempt timeout must be greater than zero",
            ));
        }

        let mut seen = BTreeSet::new();
        let mut candidates = Vec::with_capacity(self.transports.len());
        for transport in self.transports {
            let provider = transport.identity();
            if !seen.insert(provider) {
                return Err(GatewayError::configuration(format!(
                    "provider {provider} is configured more than once"
                )));
            }
            candidates.push(Candidate {
                bulkhead: Bulkhead::new(provider, self.max_concurrency)?,
                transport,
            });
        }

        let gateway = Gateway::new(
            candidates,
            self.retry_policy.unwrap_or_else(RetryPolicy::with_defaults),
            self.metrics.unwrap_or_default(),
            self.attempt_timeout,
        );

        info!(
            providers = ?gateway.providers(),
            max_retries = gateway.retry_policy().config().max_retries,
            attempt_timeout_ms = self.attempt_timeout.as_millis() as u64,
            "Gateway initialized"
        );

        Ok(gateway)
    }
}

impl Default for GatewayBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for GatewayBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayBuilder")
            .field(
                "providers",
                &self.transports.iter().map(|t| t.identity()).collect::<Vec<_>>(),
            )
            .field("attempt_timeout", &self.attempt_timeout)
            .field("max_concurrency", &self.max_concurrency)
            .finish_non_exhaustive()
    }
}

impl Gateway {
    /// Start building a gateway
    #[must_use]
    pub fn builder() -> GatewayBuilder {
        GatewayBuilder::new()
    }

    /// Build the HTTP transports and policies described by a loaded configuration
    ///
    /// # Errors
    /// Returns error if a transport or the retry policy cannot be built
    pub fn from_config(config: &GatewayConfig) -> GatewayResult<Self> {
        let client = http_client(config.attempt_timeout)?;
        let transports = build_transports(&config.registry, &client)?;

        Self::builder()
            .transports(transports)
            .retry_policy(RetryPolicy::new(config.retry.clone())?)
            .attempt_timeout(config.attempt_timeout)
            .max_concurrency_per_provider(config.max_concurrency_per_provider)
            .build()
    }
}
