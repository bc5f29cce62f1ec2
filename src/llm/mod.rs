//! LLM gateway module for replaying prompts against candidate models.
//!
//! The gateway is an external collaborator: the core never talks to a
//! provider directly. This module provides the trait-based seam plus an
//! OpenAI-compatible HTTP adapter and a scripted in-process gateway.

mod error;
mod http;
mod scripted;

pub use error::{classify_http_status, GatewayError, GatewayErrorKind};
pub use http::HttpGateway;
pub use scripted::{ScriptedGateway, ScriptedResponse};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Role in a chat conversation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A message in a chat conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Token usage reported for a completion.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl TokenUsage {
    /// Create a usage object ensuring `total_tokens` is consistent.
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }
}

/// Generation parameters forwarded to the gateway for every replayed call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChatOptions {
    /// Sampling temperature (0 = deterministic).
    pub temperature: f64,
    /// Maximum output tokens to generate.
    pub max_tokens: u32,
}

/// A completed call as reported by the gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: Option<String>,
    pub usage: TokenUsage,
    pub latency_ms: f64,
}

/// Trait for LLM invocation gateways.
#[async_trait]
pub trait LlmGateway: Send + Sync {
    /// Whether the gateway can route calls to `model`.
    ///
    /// Checked for every candidate before any call is scheduled.
    fn supports_model(&self, _model: &str) -> bool {
        true
    }

    /// Send a chat completion request.
    async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> Result<Completion, GatewayError>;
}
