//! Azure OpenAI provider implementation.
//!
//! Key differences from plain OpenAI:
//! - URL structure: `{endpoint}/openai/deployments/{deployment}/chat/completions`
//! - Authentication via API key in the `api-key` header, or an Entra ID bearer token
//! - API version required as query parameter

use crate::auth::{Authenticator, KeyPlacement, COGNITIVE_SERVICES_RESOURCE};
use crate::http::{endpoint_url, execute};
use crate::wire::ChatCompletionRequest;
use async_trait::async_trait;
use gateway_config::{ProviderConfig, EXTRA_API_VERSION};
use gateway_core::{
    AIResponse, GatewayError, ProviderError, ProviderIdentity, ProviderTransport, RequestContext,
};
use reqwest::Client;
use tracing::debug;
use url::Url;

/// Azure OpenAI API version
pub const DEFAULT_API_VERSION: &str = "2024-02-15-preview";

/// Transport for an Azure OpenAI deployment
#[derive(Debug)]
pub struct AzureOpenAiTransport {
    client: Client,
    url: Url,
    deployment: String,
    auth: Authenticator,
}

impl AzureOpenAiTransport {
    /// Create a transport from its configuration
    ///
    /// # Errors
    /// Returns error if the endpoint or credential cannot be used
    pub fn new(config: &ProviderConfig, client: Client) -> Result<Self, GatewayError> {
        let endpoint = config.resolved_endpoint()?;
        let deployment = config.deployment_or_model.clone();
        let url = endpoint_url(
            &endpoint,
            &["openai", "deployments", deployment.as_str(), "chat", "completions"],
            Some(config.extra(EXTRA_API_VERSION).unwrap_or(DEFAULT_API_VERSION)),
        )?;
        let auth = Authenticator::from_credential(
            &config.credential,
            &client,
            KeyPlacement::ApiKeyHeader,
            COGNITIVE_SERVICES_RESOURCE,
        )?;

        Ok(Self {
            client,
            url,
            deployment,
            auth,
        })
    }

    /// The chat completions URL requests are sent to
    #[must_use]
    pub fn completions_url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl ProviderTransport for AzureOpenAiTransport {
    fn identity(&self) -> ProviderIdentity {
        ProviderIdentity::AzureOpenAi
    }

    async fn call(&self, context: &RequestContext) -> Result<AIResponse, ProviderError> {
        let body = ChatCompletionRequest::new(&context.messages, context.max_tokens);

        debug!(
            deployment = %self.deployment,
            request_id = %context.request_id,
            "Sending request to Azure OpenAI"
        );

        let request = self.client.post(self.url.clone()).json(&body);
        let request = self.auth.apply(request).await?;
        execute(request, self.identity(), &self.deployment).await
    }
}
