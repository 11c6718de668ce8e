//! Bulkhead pattern for resource isolation.
//!
//! Caps the number of in-flight attempts against one provider so a slow backend
//! cannot absorb every task in the process. Callers wait for a permit; there is
//! no queue timeout because the orchestrator already races the wait against
//! cancellation and the request deadline.

use gateway_core::{GatewayError, ProviderIdentity};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

/// Default in-flight cap per provider
pub const DEFAULT_MAX_CONCURRENT: u32 = 16;

/// Concurrency limiter for one provider
#[derive(Debug)]
pub struct Bulkhead {
    provider: ProviderIdentity,
    max_concurrent: u32,
    semaphore: Arc<Semaphore>,
}

impl Bulkhead {
    /// Create a new bulkhead
    ///
    /// # Errors
    /// Returns `GatewayError::Configuration` when `max_concurrent` is zero
    pub fn new(provider: ProviderIdentity, max_concurrent: u32) -> Result<Self, GatewayError> {
        if max_concurrent == 0 {
            return Err(GatewayError::configuration(format!(
                "max concurrency for {provider} must be at least 1"
            )));
        }
        Ok(Self {
            provider,
            max_concurrent,
            semaphore: Arc::new(Semaphore::new(max_concurrent as usize)),
        })
    }

    /// Provider guarded by this bulkhead
    #[must_use]
    pub fn provider(&self) -> ProviderIdentity {
        self.provider
    }

    /// Wait for a permit to call the provider
    ///
    /// # Errors
    /// Returns error only if the semaphore was closed
    pub async fn acquire(&self) -> Result<BulkheadPermit, GatewayError> {
        if self.semaphore.available_permits() == 0 {
            debug!(
                provider = %self.provider,
                max_concurrent = self.max_concurrent,
                "Waiting for bulkhead permit"
            );
        }

        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| {
                GatewayError::configuration(format!("bulkhead for {} is closed", self.provider))
            })?;

        Ok(BulkheadPermit {
            _permit: permit,
            provider: self.provider,
        })
    }

    /// Take a permit if one is free right now
    #[must_use]
    pub fn try_acquire(&self) -> Option<BulkheadPermit> {
        Arc::clone(&self.semaphore)
            .try_acquire_owned()
            .ok()
            .map(|permit| BulkheadPermit {
                _permit: permit,
                provider: self.provider,
            })
    }

    /// Get the number of available permits
    #[must_use]
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Get the number of in-flight attempts
    #[must_use]
    pub fn active_requests(&self) -> u32 {
        let available = self.semaphore.available_permits() as u32;
        self.max_concurrent.saturating_sub(available)
    }

    /// Get current statistics
    #[must_use]
    pub fn stats(&self) -> BulkheadStats {
        BulkheadStats {
            active_requests: self.active_requests(),
            max_concurrent: self.max_concurrent,
        }
    }
}

/// A permit from a bulkhead
///
/// The permit is automatically released when dropped.
#[derive(Debug)]
pub struct BulkheadPermit {
    _permit: OwnedSemaphorePermit,
    provider: ProviderIdentity,
}

impl BulkheadPermit {
    /// Provider this permit belongs to
    #[must_use]
    pub fn provider(&self) -> ProviderIdentity {
        self.provider
    }
}

/// Bulkhead statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkheadStats {
    /// Number of in-flight attempts
    pub active_requests: u32,
    /// Maximum concurrent attempts
    pub max_concurrent: u32,
}

impl BulkheadStats {
    /// Calculate utilization percentage
    #[must_use]
    pub fn utilization(&self) -> f64 {
        if self.max_concurrent == 0 {
            0.0
        } else {
            f64::from(self.active_requests) / f64::from(self.max_concurrent) * 100.0
        }
    }
}
