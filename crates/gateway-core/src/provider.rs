//! Provider identities and the transport trait.

use crate::error::ProviderError;
use crate::request::RequestContext;
use crate::response::AIResponse;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The configured backends the gateway can talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderIdentity {
    /// Azure OpenAI Service (hosted cloud, deployment-based)
    AzureOpenAi,
    /// Azure AI Studio / Foundry model inference endpoint (workspace-hosted)
    AzureAiStudio,
    /// Self-hosted OpenAI-compatible inference server (Ollama, vLLM, ...)
    SelfHosted,
}

impl ProviderIdentity {
    /// Every identity, in declaration order
    pub const ALL: [Self; 3] = [Self::AzureOpenAi, Self::AzureAiStudio, Self::SelfHosted];

    /// Stable kebab-case name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AzureOpenAi => "azure-openai",
            Self::AzureAiStudio => "azure-ai-studio",
            Self::SelfHosted => "self-hosted",
        }
    }

    /// Environment variable prefix for this provider's settings
    #[must_use]
    pub const fn env_prefix(self) -> &'static str {
        match self {
            Self::AzureOpenAi => "AZURE_OPENAI",
            Self::AzureAiStudio => "AZURE_AI_STUDIO",
            Self::SelfHosted => "SELF_HOSTED",
        }
    }
}

impl fmt::Display for ProviderIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderIdentity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|id| id.as_str() == normalized)
            .ok_or_else(|| format!("unknown provider '{s}'"))
    }
}

/// Performs one network call against one configured provider.
///
/// Implementations translate the uniform [`RequestContext`] into the provider's
/// wire format and classify every failure into a [`ProviderError`]. They never
/// retry; retry and fallback belong to the orchestrator.
#[async_trait]
pub trait ProviderTransport: Send + Sync {
    /// Which provider this transport talks to
    fn identity(&self) -> ProviderIdentity;

    /// Send the conversation and return the generated text
    async fn call(&self, context: &RequestContext) -> Result<AIResponse, ProviderError>;
}
