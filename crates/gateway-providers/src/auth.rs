//! Request authentication.
//!
//! Static keys are attached as-is. Managed identity tokens are fetched from the
//! platform token endpoint on first use and cached until five minutes before
//! they expire. Concurrent callers that find the cache stale wait on the same
//! refresh instead of each hitting the endpoint.

use crate::classify::{classify_status, classify_transport};
use chrono::Utc;
use gateway_config::Credential;
use gateway_core::{ErrorKind, GatewayError, ProviderError};
use reqwest::{Client, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;
use url::Url;

/// Azure Instance Metadata Service token endpoint
pub const IMDS_TOKEN_ENDPOINT: &str = "http://169.254.169.254/metadata/identity/oauth2/token";
const IMDS_API_VERSION: &str = "2018-02-01";
const APP_SERVICE_API_VERSION: &str = "2019-08-01";
const APP_SERVICE_ENDPOINT_VAR: &str = "IDENTITY_ENDPOINT";
const APP_SERVICE_HEADER_VAR: &str = "IDENTITY_HEADER";

/// Seconds before expiry at which a cached token is considered stale
const EXPIRY_SAFETY_WINDOW_SECS: i64 = 300;

/// Token audience for Azure OpenAI
pub const COGNITIVE_SERVICES_RESOURCE: &str = "https://cognitiveservices.azure.com";
/// Token audience for Azure AI Studio / Machine Learning endpoints
pub const AZURE_ML_RESOURCE: &str = "https://ml.azure.com";

/// Where managed identity tokens come from
#[derive(Clone)]
pub enum TokenEndpoint {
    /// Azure IMDS protocol (`Metadata: true` header)
    Imds(Url),
    /// App Service / Functions protocol (`X-IDENTITY-HEADER` secret)
    AppService {
        /// Value of `IDENTITY_ENDPOINT`
        url: Url,
        /// Value of `IDENTITY_HEADER`
        header: SecretString,
    },
}

impl fmt::Debug for TokenEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Imds(url) => f.debug_tuple("Imds").field(&url.as_str()).finish(),
            Self::AppService { url, .. } => f
                .debug_struct("AppService")
                .field("url", &url.as_str())
                .finish_non_exhaustive(),
        }
    }
}

impl TokenEndpoint {
    /// Pick the endpoint: an explicit override, else App Service variables, else IMDS
    ///
    /// # Errors
    /// Returns error if `IDENTITY_ENDPOINT` is set but is not a valid URL
    pub fn detect(override_url: Option<Url>) -> Result<Self, url::ParseError> {
        if let Some(url) = override_url {
            return Ok(Self::Imds(url));
        }

        let app_service = std::env::var(APP_SERVICE_ENDPOINT_VAR)
            .ok()
            .zip(std::env::var(APP_SERVICE_HEADER_VAR).ok());
        if let Some((endpoint, header)) = app_service {
            debug!("Using App Service managed identity endpoint");
            return Ok(Self::AppService {
                url: Url::parse(&endpoint)?,
                header: SecretString::new(header),
            });
        }

        Url::parse(IMDS_TOKEN_ENDPOINT).map(Self::Imds)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<NumberOrString>,
    #[serde(default)]
    expires_on: Option<NumberOrString>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(i64),
    String(String),
}

impl NumberOrString {
    fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::String(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Clone)]
struct CachedToken {
    token: SecretString,
    exp_unix: i64,
}

impl CachedToken {
    fn is_fresh(&self, now_unix: i64) -> bool {
        self.exp_unix - EXPIRY_SAFETY_WINDOW_SECS > now_unix
    }
}

/// Managed identity bearer token provider with an expiry-aware cache
pub struct ManagedIdentityTokenSource {
    client: Client,
    endpoint: TokenEndpoint,
    resource: String,
    client_id: Option<String>,
    cache: Mutex<Option<CachedToken>>,
}

impl fmt::Debug for ManagedIdentityTokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedIdentityTokenSource")
            .field("endpoint", &self.endpoint)
            .field("resource", &self.resource)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

impl ManagedIdentityTokenSource {
    /// Create a token source
    #[must_use]
    pub fn new(
        client: Client,
        endpoint: TokenEndpoint,
        resource: impl Into<String>,
        client_id: Option<String>,
    ) -> Self {
        Self {
            client,
            endpoint,
            resource: resource.into(),
            client_id,
            cache: Mutex::new(None),
        }
    }

    /// Current token, fetching a new one if the cached one is stale
    ///
    /// # Errors
    /// Returns an `AuthenticationFailure` if the endpoint refuses the identity, or
    /// a retryable kind if the endpoint is unreachable, throttled or failing
    pub async fn token(&self) -> Result<SecretString, ProviderError> {
        let mut cache = self.cache.lock().await;
        if let Some(cached) = cache.as_ref().filter(|c| c.is_fresh(Utc::now().timestamp())) {
            return Ok(cached.token.clone());
        }

        let fetched = self.fetch().await?;
        let token = fetched.token.clone();
        *cache = Some(fetched);
        Ok(token)
    }

    async fn fetch(&self) -> Result<CachedToken, ProviderError> {
        let request = match &self.endpoint {
            TokenEndpoint::Imds(url) => self
                .client
                .get(url.clone())
                .header("Metadata", "true")
                .query(&[("api-version", IMDS_API_VERSION)]),
            TokenEndpoint::AppService { url, header } => self
                .client
                .get(url.clone())
                .header("X-IDENTITY-HEADER", header.expose_secret().as_str())
                .query(&[("api-version", APP_SERVICE_API_VERSION)]),
        };
        let mut request = request.query(&[("resource", self.resource.as_str())]);
        if let Some(client_id) = &self.client_id {
            request = request.query(&[("client_id", client_id.as_str())]);
        }

        debug!(
            resource = %self.resource,
            endpoint = ?self.endpoint,
            "Fetching managed identity token"
        );

        let response = request
            .send()
            .await
            .map_err(|e| token_error(classify_transport(&e)))?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let body = response.text().await.unwrap_or_default();
            return Err(token_error(classify_status(status, &headers, &body)));
        }

        let payload: TokenResponse = response.json().await.map_err(|e| {
            ProviderError::authentication(format!("malformed token response: {e}"))
        })?;

        let now = Utc::now().timestamp();
        let exp_unix = payload
            .expires_in
            .as_ref()
            .and_then(NumberOrString::as_i64)
            .map(|secs| now + secs)
            .or_else(|| payload.expires_on.as_ref().and_then(NumberOrString::as_i64))
            .unwrap_or(now);

        Ok(CachedToken {
            token: SecretString::new(payload.access_token),
            exp_unix,
        })
    }
}

/// Outages, throttling and timeouts keep their kind so the call is retried;
/// any other refusal means the identity cannot get a token.
fn token_error(error: ProviderError) -> ProviderError {
    let kind = match error.kind {
        ErrorKind::TransientNetwork
        | ErrorKind::Timeout
        | ErrorKind::RateLimited
        | ErrorKind::ServerError5xx => error.kind,
        _ => ErrorKind::AuthenticationFailure,
    };
    ProviderError {
        kind,
        message: format!("token endpoint: {}", error.message),
        ..error
    }
}

/// How a transport authenticates each call
#[derive(Debug, Clone)]
pub enum Authenticator {
    /// Static key in the `api-key` header
    ApiKeyHeader(SecretString),
    /// Static key as a bearer token
    BearerKey(SecretString),
    /// Managed identity bearer token
    ManagedIdentity(Arc<ManagedIdentityTokenSource>),
    /// Unauthenticated
    None,
}

/// Where a static key goes on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPlacement {
    /// `api-key: <key>`
    ApiKeyHeader,
    /// `Authorization: Bearer <key>`
    Bearer,
}

impl Authenticator {
    /// Build the authenticator for a configured credential
    ///
    /// # Errors
    /// Returns a configuration error if the managed identity endpoint is malformed
    pub fn from_credential(
        credential: &Credential,
        client: &Client,
        placement: KeyPlacement,
        resource: &str,
    ) -> Result<Self, GatewayError> {
        Ok(match credential {
            Credential::ApiKey(key) => match placement {
                KeyPlacement::ApiKeyHeader => Self::ApiKeyHeader(key.clone()),
                KeyPlacement::Bearer => Self::BearerKey(key.clone()),
            },
            Credential::ManagedIdentity {
                client_id,
                token_endpoint,
            } => {
                let endpoint = TokenEndpoint::detect(token_endpoint.clone()).map_err(|e| {
                    GatewayError::configuration(format!("invalid managed identity endpoint: {e}"))
                })?;
                Self::ManagedIdentity(Arc::new(ManagedIdentityTokenSource::new(
                    client.clone(),
                    endpoint,
                    resource,
                    client_id.clone(),
                )))
            }
            Credential::None => Self::None,
        })
    }

    /// Attach credentials to an outgoing request
    ///
    /// # Errors
    /// Returns an `AuthenticationFailure` if a token cannot be acquired
    pub async fn apply(&self, request: RequestBuilder) -> Result<RequestBuilder, ProviderError> {
        Ok(match self {
            Self::ApiKeyHeader(key) => request.header("api-key", key.expose_secret().as_str()),
            Self::BearerKey(key) => request.bearer_auth(key.expose_secret()),
            Self::ManagedIdentity(source) => {
                let token = source.token().await?;
                request.bearer_auth(token.expose_secret())
            }
            Self::None => request,
        })
    }
}
