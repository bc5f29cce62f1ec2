//! Scripted gateway returning fixed completions.
//!
//! Used for dry runs and deterministic tests: every model answers with a
//! preconfigured response, optionally overridden per prompt.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::{
    ChatMessage, ChatOptions, Completion, GatewayError, GatewayErrorKind, LlmGateway, Role,
    TokenUsage,
};

/// Canned outcome for a scripted call.
#[derive(Debug, Clone)]
pub enum ScriptedResponse {
    Reply {
        text: String,
        prompt_tokens: u64,
        completion_tokens: u64,
        latency_ms: f64,
    },
    Fail(String),
}

impl ScriptedResponse {
    pub fn reply(text: impl Into<String>, prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self::Reply {
            text: text.into(),
            prompt_tokens,
            completion_tokens,
            latency_ms: 100.0,
        }
    }

    pub fn with_latency(self, latency: f64) -> Self {
        match self {
            Self::Reply {
                text,
                prompt_tokens,
                completion_tokens,
                ..
            } => Self::Reply {
                text,
                prompt_tokens,
                completion_tokens,
                latency_ms: latency,
            },
            other => other,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self::Fail(message.into())
    }
}

#[derive(Debug, Default)]
struct ScriptedModel {
    default: Option<ScriptedResponse>,
    /// (substring of the last user message, response)
    overrides: Vec<(String, ScriptedResponse)>,
}

/// In-process gateway with fixed per-model responses.
#[derive(Debug, Default)]
pub struct ScriptedGateway {
    models: HashMap<String, ScriptedModel>,
    calls: AtomicUsize,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default response of `model`.
    pub fn with_model(mut self, model: impl Into<String>, response: ScriptedResponse) -> Self {
        self.models.entry(model.into()).or_default().default = Some(response);
        self
    }

    /// Override the response of `model` for prompts whose last user message
    /// contains `needle`.
    pub fn with_reply_for(
        mut self,
        model: impl Into<String>,
        needle: impl Into<String>,
        response: ScriptedResponse,
    ) -> Self {
        self.models
            .entry(model.into())
            .or_default()
            .overrides
            .push((needle.into(), response));
        self
    }

    /// Number of calls served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmGateway for ScriptedGateway {
    fn supports_model(&self, model: &str) -> bool {
        self.models.contains_key(model)
    }

    async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
        _options: &ChatOptions,
    ) -> Result<Completion, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let scripted = self.models.get(model).ok_or_else(|| {
            GatewayError::new(GatewayErrorKind::NotFound, format!("unknown model {}", model))
        })?;

        let last_user = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default();

        let response = scripted
            .overrides
            .iter()
            .find(|(needle, _)| last_user.contains(needle.as_str()))
            .map(|(_, response)| response)
            .or(scripted.default.as_ref())
            .ok_or_else(|| {
                GatewayError::new(
                    GatewayErrorKind::NotFound,
                    format!("no scripted response for {}", model),
                )
            })?;

        match response {
            ScriptedResponse::Reply {
                text,
                prompt_tokens,
                completion_tokens,
                latency_ms,
            } => Ok(Completion {
                text: Some(text.clone()),
                usage: TokenUsage::new(*prompt_tokens, *completion_tokens),
                latency_ms: *latency_ms,
            }),
            ScriptedResponse::Fail(message) => Err(GatewayError::new(
                GatewayErrorKind::ServerError,
                message.clone(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> ChatOptions {
        ChatOptions {
            temperature: 0.0,
            max_tokens: 100,
        }
    }

    #[tokio::test]
    async fn test_default_and_override() {
        let gateway = ScriptedGateway::new()
            .with_model("m", ScriptedResponse::reply("default", 10, 5))
            .with_reply_for("m", "capital", ScriptedResponse::reply("Paris", 8, 1));

        let plain = gateway
            .complete("m", &[ChatMessage::user("hello")], &options())
            .await
            .unwrap();
        assert_eq!(plain.text.as_deref(), Some("default"));
        assert_eq!(plain.usage.total_tokens, 15);

        let specific = gateway
            .complete("m", &[ChatMessage::user("capital of France?")], &options())
            .await
            .unwrap();
        assert_eq!(specific.text.as_deref(), Some("Paris"));
        assert_eq!(gateway.calls(), 2);
    }

    #[tokio::test]
    async fn test_scripted_failure() {
        let gateway = ScriptedGateway::new().with_model("m", ScriptedResponse::fail("boom"));
        let err = gateway
            .complete("m", &[ChatMessage::user("hi")], &options())
            .await
            .unwrap_err();
        assert_eq!(err.kind, GatewayErrorKind::ServerError);
        assert!(!gateway.supports_model("other"));
    }
}
