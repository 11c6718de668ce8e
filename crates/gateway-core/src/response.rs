//! Response types for the gateway.

use crate::provider::ProviderIdentity;
use serde::{Deserialize, Serialize};

/// Generated text plus how it was produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AIResponse {
    /// Generated text
    pub content: String,
    /// Provenance
    pub metadata: ResponseMetadata,
}

/// Provenance of an [`AIResponse`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseMetadata {
    /// Provider that produced the content
    pub provider: ProviderIdentity,
    /// Model or deployment reported by the provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Latency of the successful attempt in milliseconds
    pub response_time_ms: u64,
    /// Total tokens consumed, when the provider reports usage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<u32>,
    /// Attempts made for the request, across all providers, including this one
    pub attempts: u32,
}

impl AIResponse {
    /// Create a response with single-attempt metadata
    #[must_use]
    pub fn new(content: impl Into<String>, provider: ProviderIdentity) -> Self {
        Self {
            content: content.into(),
            metadata: ResponseMetadata {
                provider,
                model: None,
                response_time_ms: 0,
                tokens_used: None,
                attempts: 1,
            },
        }
    }

    /// Set the reported model
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.metadata.model = Some(model.into());
        self
    }

    /// Set the token usage
    #[must_use]
    pub fn with_tokens_used(mut self, tokens: Option<u32>) -> Self {
        self.metadata.tokens_used = tokens;
        self
    }

    /// Set the response time
    #[must_use]
    pub fn with_response_time_ms(mut self, ms: u64) -> Self {
        self.metadata.response_time_ms = ms;
        self
    }
}

/// Anything a document processor may hold where generated text is expected
pub trait IntoContent {
    /// Extract the text
    fn into_content(self) -> String;
}

impl IntoContent for AIResponse {
    fn into_content(self) -> String {
        self.content
    }
}

impl IntoContent for &AIResponse {
    fn into_content(self) -> String {
        self.content.clone()
    }
}

impl IntoContent for String {
    fn into_content(self) -> String {
        self
    }
}

impl IntoContent for &str {
    fn into_content(self) -> String {
        self.to_string()
    }
}

/// Pull the generated text out of a response or a plain string
pub fn extract_content(source: impl IntoContent) -> String {
    source.into_content()
}
