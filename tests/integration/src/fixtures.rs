//! Test fixtures and sample data for integration tests

use gateway_core::{message_pair, ChatMessage};
use gateway_resilience::RetryConfig;
use serde_json::{json, Value};
use std::time::Duration;

/// Deployment name used by the Azure OpenAI mocks
pub const AZURE_DEPLOYMENT: &str = "gpt-4o";

/// Model name used by the self-hosted mocks
pub const LOCAL_MODEL: &str = "llama3";

/// Static key accepted by the Azure OpenAI mocks
pub const AZURE_KEY: &str = "integration-key";

/// A charter-drafting conversation
pub fn charter_conversation() -> Vec<ChatMessage> {
    message_pair(
        "You are an experienced project manager.",
        "Draft a project charter for migrating the CRM to the cloud.",
    )
}

/// Retry tuning with millisecond delays so tests stay fast
pub fn fast_retry(max_retries: u32) -> RetryConfig {
    RetryConfig {
        max_retries,
        base_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(20),
        ..RetryConfig::default()
    }
}

/// OpenAI-style chat completion body
pub fn chat_completion_body(model: &str, content: &str) -> Value {
    json!({
        "id": "chatcmpl-integration",
        "object": "chat.completion",
        "model": model,
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 42, "completion_tokens": 8, "total_tokens": 50}
    })
}

/// OpenAI-style error body
pub fn error_body(code: &str, message: &str) -> Value {
    json!({"error": {"code": code, "message": message}})
}

/// Managed identity token response
pub fn token_body(token: &str, expires_in_secs: u64) -> Value {
    json!({
        "access_token": token,
        "expires_in": expires_in_secs.to_string(),
        "token_type": "Bearer",
        "resource": "https://cognitiveservices.azure.com"
    })
}
