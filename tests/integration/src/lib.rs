//! Integration tests for the document generation gateway
//!
//! Every test drives a real [`Gateway`](gateway_orchestrator::Gateway) with HTTP
//! transports pointed at wiremock servers standing in for Azure OpenAI, Azure AI
//! Studio, self-hosted models and the managed identity token endpoint.

pub mod fixtures;
pub mod mock_providers;

// Re-export commonly used items
pub use fixtures::*;
pub use mock_providers::*;

#[cfg(test)]
mod config_tests;
#[cfg(test)]
mod failover_tests;
