//! # Gateway Providers
//!
//! Provider transports for the document generation gateway:
//! - Azure OpenAI (deployment-scoped URL, `api-key` header or managed identity)
//! - Azure AI Studio model inference endpoints
//! - Self-hosted OpenAI-compatible servers (Ollama, vLLM)
//!
//! Every transport makes exactly one HTTP call per invocation and reports
//! failures as a classified [`ProviderError`](gateway_core::ProviderError).
//! Retries and fallback belong to the orchestrator.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod ai_studio;
pub mod auth;
pub mod azure_openai;
pub mod classify;
mod http;
pub mod self_hosted;
mod wire;

pub use ai_studio::AzureAiStudioTransport;
pub use auth::{Authenticator, KeyPlacement, ManagedIdentityTokenSource, TokenEndpoint};
pub use azure_openai::AzureOpenAiTransport;
pub use classify::{classify_status, classify_transport, parse_retry_after};
pub use self_hosted::SelfHostedTransport;

use gateway_config::{ProviderConfig, ProviderRegistry};
use gateway_core::{GatewayError, ProviderIdentity, ProviderTransport};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

/// Build the shared HTTP client
///
/// `timeout` bounds each request end to end.
///
/// # Errors
/// Returns error if the TLS backend cannot be initialised
pub fn http_client(timeout: Duration) -> Result<Client, GatewayError> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .pool_max_idle_per_host(32)
        .user_agent(concat!("docgen-gateway/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| GatewayError::configuration(format!("failed to build HTTP client: {e}")))
}

/// Build the transport for one configured provider
///
/// # Errors
/// Returns error if the configuration cannot produce a working transport
pub fn build_transport(
    config: &ProviderConfig,
    client: Client,
) -> Result<Arc<dyn ProviderTransport>, GatewayError> {
    Ok(match config.identity {
        ProviderIdentity::AzureOpenAi => Arc::new(AzureOpenAiTransport::new(config, client)?),
        ProviderIdentity::AzureAiStudio => Arc::new(AzureAiStudioTransport::new(config, client)?),
        ProviderIdentity::SelfHosted => Arc::new(SelfHostedTransport::new(config, client)?),
    })
}

/// Build transports for every registered provider, primary first
///
/// # Errors
/// Returns the first configuration error encountered
pub fn build_transports(
    registry: &ProviderRegistry,
    client: &Client,
) -> Result<Vec<Arc<dyn ProviderTransport>>, GatewayError> {
    registry
        .candidates()
        .map(|config| build_transport(config, client.clone()))
        .collect()
}
