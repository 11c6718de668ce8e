//! # Gateway Config
//!
//! Provider configuration registry for the document generation gateway.
//!
//! Configuration is loaded once from environment-style key/value pairs and is
//! immutable afterwards:
//! - [`ProviderConfig`] and [`Credential`] describe how to reach one provider
//! - [`ProviderRegistry`] holds the primary and its ordered fallbacks
//! - [`GatewayConfig`] adds retry tuning, attempt timeout and bulkhead size

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod env;
pub mod error;
pub mod provider;
pub mod registry;

pub use env::{GatewayConfig, DEFAULT_ATTEMPT_TIMEOUT};
pub use error::ConfigError;
pub use provider::{
    default_endpoint, Credential, ProviderConfig, EXTRA_API_VERSION, SELF_HOSTED_DEFAULT_ENDPOINT,
};
pub use registry::ProviderRegistry;
