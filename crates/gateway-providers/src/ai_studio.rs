//! Azure AI Studio model inference provider.
//!
//! Serverless and managed online endpoints expose an OpenAI-compatible
//! `{endpoint}/chat/completions` route. The model is named in the body and the key
//! travels as a bearer token.

use crate::auth::{Authenticator, KeyPlacement, AZURE_ML_RESOURCE};
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

/// Model inference API version
pub const DEFAULT_API_VERSION: &str = "2024-05-01-preview";

/// Transport for an Azure AI Studio inference endpoint
#[derive(Debug)]
pub struct AzureAiStudioTransport {
    client: Client,
    url: Url,
    model: String,
    auth: Authenticator,
}

impl AzureAiStudioTransport {
    /// Create a transport from its configuration
    ///
    /// # Errors
    /// Returns error if the endpoint or credential cannot be used
    pub fn new(config: &ProviderConfig, client: Client) -> Result<Self, GatewayError> {
        let endpoint = config.resolved_endpoint()?;
        let url = endpoint_url(
            &endpoint,
            &["chat", "completions"],
            Some(config.extra(EXTRA_API_VERSION).unwrap_or(DEFAULT_API_VERSION)),
        )?;
        let auth = Authenticator::from_credential(
            &config.credential,
            &client,
            KeyPlacement::Bearer,
            AZURE_ML_RESOURCE,
        )?;

        Ok(Self {
            client,
            url,
            model: config.deployment_or_model.clone(),
            auth,
        })
    }
}

#[async_trait]
impl ProviderTransport for AzureAiStudioTransport {
    fn identity(&self) -> ProviderIdentity {
        ProviderIdentity::AzureAiStudio
    }

    async fn call(&self, context: &RequestContext) -> Result<AIResponse, ProviderError> {
        let body = ChatCompletionRequest::new(&context.messages, context.max_tokens)
            .with_model(&self.model);

        debug!(
            model = %self.model,
            request_id = %context.request_id,
            "Sending request to Azure AI Studio"
        );

        let request = self.client.post(self.url.clone()).json(&body);
        let request = self.auth.apply(request).await?;
        execute(request, self.identity(), &self.model).await
    }
}
