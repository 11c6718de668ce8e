//! OpenAI-style chat completion payloads shared by every provider.

use gateway_core::{AIResponse, ChatMessage, ErrorKind, ProviderError, ProviderIdentity};
use serde::{Deserialize, Serialize};

/// Request body
#[derive(Debug, Serialize)]
pub(crate) struct ChatCompletionRequest<'a> {
    /// Model name; omitted where the URL selects the deployment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<&'a str>,
    pub messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    pub stream: bool,
}

impl<'a> ChatCompletionRequest<'a> {
    pub(crate) fn new(messages: &'a [ChatMessage], max_tokens: Option<u32>) -> Self {
        Self {
            model: None,
            messages,
            max_tokens,
            stream: false,
        }
    }

    pub(crate) fn with_model(mut self, model: &'a str) -> Self {
        self.model = Some(model);
        self
    }
}

/// Response body
#[derive(Debug, Deserialize)]
pub(crate) struct ChatCompletionResponse {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Choice {
    pub message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Usage {
    #[serde(default)]
    pub total_tokens: Option<u32>,
}

impl ChatCompletionResponse {
    /// Convert into the uniform response, rejecting payloads without text
    pub(crate) fn into_ai_response(
        self,
        provider: ProviderIdentity,
        default_model: &str,
    ) -> Result<AIResponse, ProviderError> {
        let content = self
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                ProviderError::new(ErrorKind::Unknown, "response contained no message content")
            })?;

        Ok(AIResponse::new(content, provider)
            .with_model(self.model.unwrap_or_else(|| default_model.to_string()))
            .with_tokens_used(self.usage.and_then(|u| u.total_tokens)))
    }
}
