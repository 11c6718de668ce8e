//! Retry policy with exponential backoff.
//!
//! The policy is a pure decision function: given the kind of the last failure and
//! how many retries were already spent on the current provider, it answers
//! [`RetryDecision::Retry`] with a delay or [`RetryDecision::GiveUp`]. Sleeping and
//! re-invoking the transport is the orchestrator's job.

use gateway_core::{ErrorKind, GatewayError};
use rand::Rng;
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::debug;

/// Retry configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of retries per provider (attempts = retries + 1)
    pub max_retries: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Upper bound for any delay
    pub max_delay: Duration,
    /// Backoff multiplier, strictly greater than 1
    pub multiplier: f64,
    /// Subtractive jitter fraction (0.0 - 1.0); 0 keeps delays deterministic
    pub jitter: f64,
    /// Error kinds eligible for retry on the same provider
    pub retryable: BTreeSet<ErrorKind>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
            jitter: 0.0,
            retryable: ErrorKind::DEFAULT_RETRYABLE.into_iter().collect(),
        }
    }
}

impl RetryConfig {
    /// Validate the configuration
    ///
    /// # Errors
    /// Returns `GatewayError::Configuration` naming the violated constraint
    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.max_delay < self.base_delay {
            return Err(GatewayError::configuration(format!(
                "retry max_delay ({}ms) must be >= base_delay ({}ms)",
                self.max_delay.as_millis(),
                self.base_delay.as_millis()
            )));
        }
        if !self.multiplier.is_finite() || self.multiplier <= 1.0 {
            return Err(GatewayError::configuration(format!(
                "retry multiplier must be > 1, got {}",
                self.multiplier
            )));
        }
        if !(0.0..=1.0).contains(&self.jitter) {
            return Err(GatewayError::configuration(format!(
                "retry jitter must be between 0.0 and 1.0, got {}",
                self.jitter
            )));
        }
        Ok(())
    }
}

/// Outcome of consulting the policy after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Try the same provider again after waiting
    Retry {
        /// How long to wait
        after: Duration,
    },
    /// Stop retrying this provider
    GiveUp,
}

/// Retry policy implementation
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    /// Create a new retry policy with the given configuration
    ///
    /// # Errors
    /// Returns error if the configuration is invalid
    pub fn new(config: RetryConfig) -> Result<Self, GatewayError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Create with default configuration
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            config: RetryConfig::default(),
        }
    }

    /// Create a builder
    #[must_use]
    pub fn builder() -> RetryPolicyBuilder {
        RetryPolicyBuilder::new()
    }

    /// Whether `kind` may be retried on the same provider
    #[must_use]
    pub fn is_retryable(&self, kind: ErrorKind) -> bool {
        self.config.retryable.contains(&kind)
    }

    /// Decide what to do after a failure.
    ///
    /// `retries_so_far` counts retries already made against the current provider
    /// for this request, so it is 0 after the initial attempt fails.
    #[must_use]
    pub fn decide(&self, kind: ErrorKind, retries_so_far: u32) -> RetryDecision {
        if !self.is_retryable(kind) {
            debug!(error_kind = %kind, "Error kind is not retryable");
            return RetryDecision::GiveUp;
        }
        if retries_so_far >= self.config.max_retries {
            debug!(
                retries = retries_so_far,
                max_retries = self.config.max_retries,
                "Retry budget exhausted"
            );
            return RetryDecision::GiveUp;
        }

        RetryDecision::Retry {
            after: self.apply_jitter(self.backoff_delay(retries_so_far)),
        }
    }

    /// Deterministic delay before retry number `retries_so_far + 1`:
    /// `min(max_delay, base_delay * multiplier^retries_so_far)`
    #[must_use]
    pub fn backoff_delay(&self, retries_so_far: u32) -> Duration {
        let exponent = i32::try_from(retries_so_far).unwrap_or(i32::MAX);
        let delay =
            self.config.base_delay.as_nanos() as f64 * self.config.multiplier.powi(exponent);
        if delay >= self.config.max_delay.as_nanos() as f64 {
            return self.config.max_delay;
        }
        Duration::from_nanos(delay as u64)
    }

    /// Subtract up to `jitter * delay`, keeping the result within `[0, delay]`
    fn apply_jitter(&self, delay: Duration) -> Duration {
        if self.config.jitter <= 0.0 || delay.is_zero() {
            return delay;
        }
        let nanos = delay.as_nanos() as f64;
        let reduction = rand::thread_rng().gen_range(0.0..=nanos * self.config.jitter);
        Duration::from_nanos((nanos - reduction).max(0.0) as u64)
    }

    /// Get the configuration
    #[must_use]
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Builder for retry policy
#[derive(Debug, Default)]
pub struct RetryPolicyBuilder {
    config: RetryConfig,
}

impl RetryPolicyBuilder {
    /// Create a new builder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set max retries
    #[must_use]
    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    /// Set base delay
    #[must_use]
    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.config.base_delay = delay;
        self
    }

    /// Set max delay
    #[must_use]
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.config.max_delay = delay;
        self
    }

    /// Set backoff multiplier
    #[must_use]
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.config.multiplier = multiplier;
        self
    }

    /// Set jitter factor
    #[must_use]
    pub fn jitter(mut self, jitter: f64) -> Self {
        self.config.jitter = jitter;
        self
    }

    /// Replace the retryable error kinds
    #[must_use]
    pub fn retryable(mut self, kinds: impl IntoIterator<Item = ErrorKind>) -> Self {
        self.config.retryable = kinds.into_iter().collect();
        self
    }

    /// Build the policy
    ///
    /// # Errors
    /// Returns error if the configuration is invalid
    pub fn build(self) -> Result<RetryPolicy, GatewayError> {
        RetryPolicy::new(self.config)
    }
}
