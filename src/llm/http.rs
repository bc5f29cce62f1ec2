//! OpenAI-compatible HTTP gateway adapter (LiteLLM proxy, OpenRouter, ...).

use std::collections::HashSet;
use std::time::Instant;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{
    ChatMessage, ChatOptions, Completion, GatewayError, GatewayErrorKind, LlmGateway, TokenUsage,
};

/// Gateway that forwards chat completions to an OpenAI-compatible endpoint.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    /// When set, only these model ids are routable.
    allowed_models: Option<HashSet<String>>,
}

impl HttpGateway {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            allowed_models: None,
        }
    }

    /// Restrict routing to a fixed set of models.
    pub fn with_allowed_models<I, S>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_models = Some(models.into_iter().map(Into::into).collect());
        self
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

#[async_trait]
impl LlmGateway for HttpGateway {
    fn supports_model(&self, model: &str) -> bool {
        self.allowed_models
            .as_ref()
            .map(|allowed| allowed.contains(model))
            .unwrap_or(true)
    }

    async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> Result<Completion, GatewayError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = CompletionRequest {
            model,
            messages,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        };

        debug!(model, message_count = messages.len(), "Sending completion to gateway");

        let started = Instant::now();
        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            let kind = if e.is_timeout() {
                GatewayErrorKind::Timeout
            } else {
                GatewayErrorKind::Transport
            };
            GatewayError::new(kind, e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(model, status = status.as_u16(), "Gateway returned error status");
            return Err(GatewayError::from_status(status.as_u16(), text));
        }

        let parsed: CompletionResponse = response.json().await.map_err(|e| {
            GatewayError::new(
                GatewayErrorKind::InvalidResponse,
                format!("Failed to parse completion: {}", e),
            )
        })?;
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content);
        let usage = parsed
            .usage
            .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        Ok(Completion {
            text,
            usage,
            latency_ms,
        })
    }
}
