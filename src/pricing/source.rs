//! Price source abstraction.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Per-million-token prices in USD.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPrice {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

impl ModelPrice {
    pub const fn new(input_per_million: f64, output_per_million: f64) -> Self {
        Self {
            input_per_million,
            output_per_million,
        }
    }

    /// Cost in USD of a call with the given token counts.
    pub fn cost_usd(&self, prompt_tokens: u64, completion_tokens: u64) -> f64 {
        let input = prompt_tokens as f64 * self.input_per_million / 1_000_000.0;
        let output = completion_tokens as f64 * self.output_per_million / 1_000_000.0;
        (input + output).max(0.0)
    }
}

/// Outcome of a price lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PriceLookup {
    Known(ModelPrice),
    Unknown,
}

/// External pricing service.
///
/// # Invariants
/// - `lookup()` never fails; transport and decoding problems surface as `Unknown`
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn lookup(&self, provider: &str, model: &str) -> PriceLookup;
}

/// Infer the provider of a model from its id.
pub fn provider_for(model: &str) -> &'static str {
    let lower = model.to_lowercase();
    if lower.contains("gpt") || lower.contains("openai") || lower.starts_with("o1") {
        "openai"
    } else if lower.contains("claude") || lower.contains("anthropic") {
        "anthropic"
    } else if lower.contains("gemini") || lower.contains("vertex") {
        "google"
    } else if lower.contains("llama") || lower.contains("meta") {
        "meta"
    } else if lower.contains("mistral") || lower.contains("mixtral") {
        "mistral"
    } else {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cost_usd() {
        let price = ModelPrice::new(2.5, 10.0);
        let cost = price.cost_usd(1_000, 500);
        assert!((cost - (0.0025 + 0.005)).abs() < 1e-12);
        assert_eq!(price.cost_usd(0, 0), 0.0);
    }

    #[test]
    fn test_provider_for() {
        assert_eq!(provider_for("gpt-4o-mini"), "openai");
        assert_eq!(provider_for("claude-3-5-haiku-20250122"), "anthropic");
        assert_eq!(provider_for("gemini-2.5-flash"), "google");
        assert_eq!(provider_for("meta.llama-3.1-70b-instruct-maas"), "meta");
        assert_eq!(provider_for("mixtral-8x7b"), "mistral");
        assert_eq!(provider_for("something-new"), "openai");
    }
}
