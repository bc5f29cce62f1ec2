//! Request and per-call result types shared across the pipeline.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::llm::{ChatMessage, ChatOptions, Role};

/// Optional, typed metadata attached to a historical prompt.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PromptMetadata {
    /// Free-form label of the workload (e.g. "math_qa").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_case: Option<String>,
    /// Model that originally served this prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_model: Option<String>,
    /// JSON object with a `required` list of keys the output must contain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_schema: Option<serde_json::Value>,
    /// Known-good answer to compare outputs against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_output: Option<String>,
    /// Minimum acceptable output length in characters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_output_chars: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// A single historical LLM call to replay.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Prompt {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub metadata: PromptMetadata,
    /// Output the original model produced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline_output: Option<String>,
    /// What the original call cost, in USD. Reported on every result for
    /// this prompt as `original_cost_usd`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline_cost: Option<f64>,
}

impl Prompt {
    /// Prompt with a single user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: None,
            messages: vec![ChatMessage::user(content)],
            metadata: PromptMetadata::default(),
            baseline_output: None,
            baseline_cost: None,
        }
    }

    /// Id used in results; falls back to the prompt's position.
    pub fn id_or(&self, index: usize) -> String {
        self.id
            .clone()
            .unwrap_or_else(|| format!("prompt-{}", index))
    }

    /// Reference output for validation, if any.
    pub fn reference_output(&self) -> Option<&str> {
        self.metadata
            .reference_output
            .as_deref()
            .or(self.baseline_output.as_deref())
    }

    /// Stable fingerprint of the conversation.
    ///
    /// Prompts with identical messages share a fingerprint and are treated as
    /// repeated invocations for consistency scoring.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for message in &self.messages {
            let role = match message.role {
                Role::System => "system",
                Role::User => "user",
                Role::Assistant => "assistant",
                Role::Tool => "tool",
            };
            hasher.update(role.as_bytes());
            hasher.update([0u8]);
            hasher.update(message.content.as_bytes());
            hasher.update([0u8]);
        }
        hex::encode(hasher.finalize())
    }

    /// Flattened transcript, used for audit rows.
    pub fn transcript(&self) -> String {
        self.messages
            .iter()
            .map(|m| format!("{:?}: {}", m.role, m.content))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn default_temperature() -> f64 {
    0.0
}

fn default_max_tokens() -> u32 {
    1000
}

/// Generation parameters applied to every replayed call.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GenerationConfig {
    /// Sampling temperature, within [0, 2].
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Maximum output tokens, within [1, 4096].
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl GenerationConfig {
    pub const MAX_TEMPERATURE: f64 = 2.0;
    pub const MAX_OUTPUT_TOKENS: u32 = 4096;

    pub fn chat_options(&self) -> ChatOptions {
        ChatOptions {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// A batch of prompts to replay across candidate models.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReplayRequest {
    pub prompts: Vec<Prompt>,
    pub models: Vec<String>,
    #[serde(flatten)]
    pub generation: GenerationConfig,
    /// Model to compare against; defaults to the most expensive one tested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline_model: Option<String>,
}

impl ReplayRequest {
    pub fn new(prompts: Vec<Prompt>, models: Vec<String>) -> Self {
        Self {
            prompts,
            models,
            generation: GenerationConfig::default(),
            baseline_model: None,
        }
    }

    pub fn with_baseline(mut self, model: impl Into<String>) -> Self {
        self.baseline_model = Some(model.into());
        self
    }

    /// Number of (prompt, model) pairs the batch will produce.
    pub fn total_calls(&self) -> usize {
        self.prompts.len() * self.models.len()
    }
}

/// Outcome of replaying one prompt against one model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReplayResult {
    pub prompt_index: usize,
    pub prompt_id: String,
    /// See [`Prompt::fingerprint`].
    pub prompt_hash: String,
    pub model: String,
    pub provider: String,
    pub success: bool,
    pub output: Option<String>,
    pub error: Option<String>,

    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    pub cost_usd: f64,
    /// Cost was computed from a fallback price tier.
    pub cost_estimated: bool,
    /// What the original production call cost, carried over from the prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_cost_usd: Option<f64>,

    pub latency_ms: f64,

    pub is_refusal: bool,
    pub validation_score: Option<f64>,
    pub validation_method: Option<String>,
    pub validation_confidence: Option<String>,
}

impl ReplayResult {
    /// A call that produced no response.
    pub fn failed(
        prompt_index: usize,
        prompt: &Prompt,
        model: &str,
        provider: &str,
        error: impl Into<String>,
    ) -> Self {
        Self {
            prompt_index,
            prompt_id: prompt.id_or(prompt_index),
            prompt_hash: prompt.fingerprint(),
            model: model.to_string(),
            provider: provider.to_string(),
            success: false,
            output: None,
            error: Some(error.into()),
            prompt_tokens: 0,
            completion_tokens: 0,
            total_tokens: 0,
            cost_usd: 0.0,
            cost_estimated: false,
            original_cost_usd: prompt.baseline_cost,
            latency_ms: 0.0,
            is_refusal: false,
            validation_score: None,
            validation_method: None,
            validation_confidence: None,
        }
    }
}
