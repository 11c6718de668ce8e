//! # Gateway Resilience
//!
//! Resilience patterns for the document generation gateway:
//! - Retry policy with exponential backoff
//! - Bulkhead pattern for per-provider concurrency isolation

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bulkhead;
pub mod retry;

// Re-export main types
pub use bulkhead::{Bulkhead, BulkheadPermit, BulkheadStats, DEFAULT_MAX_CONCURRENT};
pub use retry::{RetryConfig, RetryDecision, RetryPolicy, RetryPolicyBuilder};
