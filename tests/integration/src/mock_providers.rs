//! Mock providers for integration testing
//!
//! Wiremock servers that speak the Azure OpenAI, self-hosted and managed
//! identity protocols closely enough for the real transports.

use crate::fixtures::{
    chat_completion_body, error_body, token_body, AZURE_DEPLOYMENT, AZURE_KEY, LOCAL_MODEL,
};
use gateway_config::{Credential, ProviderConfig};
use gateway_core::ProviderIdentity;
use std::time::Duration;
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const AZURE_COMPLETIONS_PATH: &str = "/openai/deployments/gpt-4o/chat/completions";
const LOCAL_COMPLETIONS_PATH: &str = "/v1/chat/completions";
const TOKEN_PATH: &str = "/msi/token";

fn completion(model: &str, content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(chat_completion_body(model, content))
}

fn server_url(server: &MockServer) -> Url {
    Url::parse(&server.uri()).expect("mock server URI is a valid URL")
}

async fn count_requests(server: &MockServer, http_method: &str, request_path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.method.as_str() == http_method && r.url.path() == request_path)
        .count()
}

/// Mock Azure OpenAI resource with one `gpt-4o` deployment
pub struct MockAzureOpenAI {
    pub server: MockServer,
}

impl MockAzureOpenAI {
    /// Start the mock server
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Base URL of the resource
    pub fn endpoint(&self) -> Url {
        server_url(&self.server)
    }

    /// Provider config authenticating with the static test key
    pub fn api_key_config(&self) -> ProviderConfig {
        ProviderConfig::new(
            ProviderIdentity::AzureOpenAi,
            Credential::api_key(AZURE_KEY),
            AZURE_DEPLOYMENT,
        )
        .with_endpoint(self.endpoint())
    }

    /// Provider config authenticating through `tokens`
    pub fn managed_identity_config(&self, tokens: &MockTokenEndpoint) -> ProviderConfig {
        ProviderConfig::new(
            ProviderIdentity::AzureOpenAi,
            Credential::ManagedIdentity {
                client_id: None,
                token_endpoint: Some(tokens.token_url()),
            },
            AZURE_DEPLOYMENT,
        )
        .with_endpoint(self.endpoint())
    }

    /// Answer every completion request with `content`
    pub async fn mock_success(&self, content: &str) {
        Mock::given(method("POST"))
            .and(path(AZURE_COMPLETIONS_PATH))
            .respond_with(completion(AZURE_DEPLOYMENT, content))
            .mount(&self.server)
            .await;
    }

    /// Answer completion requests carrying `bearer` with `content`
    pub async fn mock_success_with_bearer(&self, bearer: &str, content: &str) {
        Mock::given(method("POST"))
            .and(path(AZURE_COMPLETIONS_PATH))
            .and(header("authorization", format!("Bearer {bearer}").as_str()))
            .respond_with(completion(AZURE_DEPLOYMENT, content))
            .mount(&self.server)
            .await;
    }

    /// Fail every completion request with `status`
    pub async fn mock_status(&self, status: u16) {
        let body = error_body(&status.to_string(), "mock failure");
        Mock::given(method("POST"))
            .and(path(AZURE_COMPLETIONS_PATH))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// Throttle the next `times` completion requests
    pub async fn mock_rate_limit(&self, times: u64, retry_after: Duration) {
        let retry_after_ms = retry_after.as_millis().to_string();
        let body = error_body("429", "Requests to the deployment have exceeded the rate limit.");
        Mock::given(method("POST"))
            .and(path(AZURE_COMPLETIONS_PATH))
            .respond_with(
                ResponseTemplate::new(429)
                    .insert_header("retry-after-ms", retry_after_ms.as_str())
                    .set_body_json(body),
            )
            .up_to_n_times(times)
            .mount(&self.server)
            .await;
    }

    /// Respond to completion requests only after `delay`
    pub async fn mock_slow(&self, delay: Duration) {
        Mock::given(method("POST"))
            .and(path(AZURE_COMPLETIONS_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(chat_completion_body(AZURE_DEPLOYMENT, "too late"))
                    .set_delay(delay),
            )
            .mount(&self.server)
            .await;
    }

    /// Completion requests received so far
    pub async fn completion_requests(&self) -> usize {
        count_requests(&self.server, "POST", AZURE_COMPLETIONS_PATH).await
    }

    /// Whether every completion request carried the static test key
    pub async fn all_requests_used_api_key(&self) -> bool {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .all(|r| r.headers.get("api-key").and_then(|v| v.to_str().ok()) == Some(AZURE_KEY))
    }
}

/// Mock OpenAI-compatible self-hosted server
pub struct MockSelfHosted {
    pub server: MockServer,
}

impl MockSelfHosted {
    /// Start the mock server
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Base URL of the server
    pub fn endpoint(&self) -> Url {
        server_url(&self.server)
    }

    /// Provider config without credentials
    pub fn config(&self) -> ProviderConfig {
        ProviderConfig::new(ProviderIdentity::SelfHosted, Credential::None, LOCAL_MODEL)
            .with_endpoint(self.endpoint())
    }

    /// Answer every completion request with `content`
    pub async fn mock_success(&self, content: &str) {
        Mock::given(method("POST"))
            .and(path(LOCAL_COMPLETIONS_PATH))
            .respond_with(completion(LOCAL_MODEL, content))
            .mount(&self.server)
            .await;
    }

    /// Fail every completion request with `status`
    pub async fn mock_status(&self, status: u16) {
        Mock::given(method("POST"))
            .and(path(LOCAL_COMPLETIONS_PATH))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    /// Completion requests received so far
    pub async fn completion_requests(&self) -> usize {
        count_requests(&self.server, "POST", LOCAL_COMPLETIONS_PATH).await
    }
}

/// Mock managed identity token endpoint (IMDS protocol)
pub struct MockTokenEndpoint {
    pub server: MockServer,
}

impl MockTokenEndpoint {
    /// Start the endpoint, issuing `token` valid for `expires_in_secs`
    pub async fn start(token: &str, expires_in_secs: u64) -> Self {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(TOKEN_PATH))
            .and(header("metadata", "true"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(token_body(token, expires_in_secs)),
            )
            .mount(&server)
            .await;
        Self { server }
    }

    /// URL to configure as the token endpoint override
    pub fn token_url(&self) -> Url {
        server_url(&self.server)
            .join(TOKEN_PATH)
            .expect("token path joins onto the mock URI")
    }

    /// Answer the next `times` token requests with `status` before issuing tokens again
    pub async fn mock_outage(&self, status: u16, times: u64) {
        Mock::given(method("GET"))
            .and(path(TOKEN_PATH))
            .respond_with(ResponseTemplate::new(status))
            .up_to_n_times(times)
            .with_priority(1)
            .mount(&self.server)
            .await;
    }

    /// Token requests received so far
    pub async fn token_requests(&self) -> usize {
        count_requests(&self.server, "GET", TOKEN_PATH).await
    }
}
