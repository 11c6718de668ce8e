//! # Gateway Core
//!
//! Core types, traits, and error handling for the document generation AI gateway.
//!
//! This crate provides the foundational types used throughout the gateway:
//! - Chat messages and per-call request context
//! - The uniform response type returned by every provider
//! - The provider transport trait and provider identities
//! - The error taxonomy shared by retry, metrics, and fallback logic

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod provider;
pub mod request;
pub mod response;

// Re-export commonly used types
pub use error::{
    CancelReason, ErrorKind, GatewayError, GatewayErrorKind, GatewayResult, ProviderError,
    ProviderFailure,
};
pub use provider::{ProviderIdentity, ProviderTransport};
pub use request::{
    message_pair, validate_conversation, ChatMessage, MessageRole, RequestContext, RequestId,
    RequestOptions,
};
pub use response::{extract_content, AIResponse, IntoContent, ResponseMetadata};
