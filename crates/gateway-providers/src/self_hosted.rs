//! Self-hosted OpenAI-compatible inference servers (Ollama, vLLM, llama.cpp).

use crate::auth::{Authenticator, KeyPlacement};
use crate::http::{endpoint_url, execute};
use crate::wire::ChatCompletionRequest;
use async_trait::async_trait;
use gateway_config::{Credential, ProviderConfig};
use gateway_core::{
    AIResponse, GatewayError, ProviderError, ProviderIdentity, ProviderTransport, RequestContext,
};
use reqwest::Client;
use tracing::debug;
use url::Url;

/// Transport for a local or private inference server
#[derive(Debug)]
pub struct SelfHostedTransport {
    client: Client,
    url: Url,
    model: String,
    auth: Authenticator,
}

impl SelfHostedTransport {
    /// Create a transport from its configuration
    ///
    /// # Errors
    /// Returns error if the endpoint is unusable or managed identity is requested
    pub fn new(config: &ProviderConfig, client: Client) -> Result<Self, GatewayError> {
        if matches!(config.credential, Credential::ManagedIdentity { .. }) {
            return Err(GatewayError::configuration(
                "managed identity is not supported for self-hosted providers",
            ));
        }

        let endpoint = config.resolved_endpoint()?;
        let ends_with_v1 = endpoint
            .path_segments()
            .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
            == Some("v1");
        let segments: &[&str] = if ends_with_v1 {
            &["chat", "completions"]
        } else {
            &["v1", "chat", "completions"]
        };
        let url = endpoint_url(&endpoint, segments, None)?;
        let auth =
            Authenticator::from_credential(&config.credential, &client, KeyPlacement::Bearer, "")?;

        Ok(Self {
            client,
            url,
            model: config.deployment_or_model.clone(),
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
impl ProviderTransport for SelfHostedTransport {
    fn identity(&self) -> ProviderIdentity {
        ProviderIdentity::SelfHosted
    }

    async fn call(&self, context: &RequestContext) -> Result<AIResponse, ProviderError> {
        let body = ChatCompletionRequest::new(&context.messages, context.max_tokens)
            .with_model(&self.model);

        debug!(model = %self.model, url = %self.url, "Sending request to self-hosted model");

        let request = self.client.post(self.url.clone()).json(&body);
        let request = self.auth.apply(request).await?;
        execute(request, self.identity(), &self.model).await
    }
}
