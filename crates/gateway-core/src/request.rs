//! Request types for the gateway.
//!
//! This module defines the conversation format every provider receives and the
//! per-call context the orchestrator threads through retries.

use crate::error::GatewayError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Operation label used when the caller does not supply one
pub const DEFAULT_OPERATION: &str = "chat";

/// Chat message with role and content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    role: MessageRole,
    content: String,
}

impl ChatMessage {
    /// Create a message with an explicit role
    #[must_use]
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a system message
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    /// Create a user message
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Create an assistant message
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    /// Role of the message author
    #[must_use]
    pub fn role(&self) -> MessageRole {
        self.role
    }

    /// Message text
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }
}

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System message
    System,
    /// User message
    User,
    /// Assistant message
    Assistant,
}

impl MessageRole {
    /// Wire name of the role
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build the common system + user conversation
#[must_use]
pub fn message_pair(system: impl Into<String>, user: impl Into<String>) -> Vec<ChatMessage> {
    vec![ChatMessage::system(system), ChatMessage::user(user)]
}

/// Check the structural rules of a conversation.
///
/// The conversation must be non-empty and contain at most one system message,
/// which must come first.
///
/// # Errors
/// Returns `GatewayError::InvalidRequest` describing the first violation
pub fn validate_conversation(messages: &[ChatMessage]) -> Result<(), GatewayError> {
    if messages.is_empty() {
        return Err(GatewayError::invalid_request("messages cannot be empty"));
    }

    let system_positions: Vec<usize> = messages
        .iter()
        .enumerate()
        .filter(|(_, m)| m.role == MessageRole::System)
        .map(|(i, _)| i)
        .collect();

    match system_positions.as_slice() {
        [] | [0] => Ok(()),
        [single] => Err(GatewayError::invalid_request(format!(
            "system message must be first, found at position {single}"
        ))),
        many => Err(GatewayError::invalid_request(format!(
            "at most one system message is allowed, found {}",
            many.len()
        ))),
    }
}

/// Unique identifier of one logical request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Generate a fresh random request ID
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// The underlying UUID
    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Caller-supplied knobs for one `submit` call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
    /// Label for log and metrics correlation
    pub operation_name: Option<String>,
    /// Per-attempt timeout, overriding the gateway default
    pub attempt_timeout: Option<Duration>,
    /// Overall budget for the whole call, retries and fallbacks included
    pub deadline: Option<Duration>,
}

impl RequestOptions {
    /// Create empty options
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the token budget
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the operation label
    #[must_use]
    pub fn with_operation(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }

    /// Set the per-attempt timeout
    #[must_use]
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = Some(timeout);
        self
    }

    /// Set the overall deadline
    #[must_use]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// Transient per-call state handed to every transport attempt
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Correlation ID for this logical request
    pub request_id: RequestId,
    /// Conversation to send
    pub messages: Vec<ChatMessage>,
    /// Token budget
    pub max_tokens: Option<u32>,
    /// Label for metrics and logging
    pub operation_name: String,
    /// Attempts already made for this request, across all providers
    pub attempts_so_far: u32,
}

impl RequestContext {
    /// Create the context for a new call
    #[must_use]
    pub fn new(messages: Vec<ChatMessage>, options: &RequestOptions) -> Self {
        Self {
            request_id: RequestId::generate(),
            messages,
            max_tokens: options.max_tokens,
            operation_name: options
                .operation_name
                .clone()
                .unwrap_or_else(|| DEFAULT_OPERATION.to_string()),
            attempts_so_far: 0,
        }
    }
}
