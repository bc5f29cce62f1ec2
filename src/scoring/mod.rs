//! Quality scoring - per-call signals and per-model aggregation.
//!
//! # Scoring Strategy
//! Per-call scoring goes through the [`OutputScorer`] trait so alternative
//! scorers can be swapped in without touching the orchestrator. The default
//! [`HeuristicScorer`] combines the refusal classifier with the rule-based
//! validator.

mod consistency;
mod refusal;
mod summary;
mod validator;

pub use consistency::{
    consistency_score, group_consistency, text_similarity, SINGLE_SAMPLE_CONSISTENCY,
};
pub use refusal::RefusalDetector;
pub use summary::{percentile, summarize, ModelSummary};
pub use validator::{HeuristicValidator, Validation};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::Prompt;

/// Coarse confidence in a validation score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ScoreConfidence {
    High,
    Medium,
    Low,
}

impl ScoreConfidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
        }
    }
}

/// What an output can be checked against.
#[derive(Debug, Clone, Copy, Default)]
pub struct Reference<'a> {
    pub output: Option<&'a str>,
    pub schema: Option<&'a serde_json::Value>,
    pub min_chars: Option<usize>,
}

impl<'a> Reference<'a> {
    /// Reference derived from a prompt, or `None` when there is nothing to
    /// validate against.
    pub fn from_prompt(prompt: &'a Prompt) -> Option<Self> {
        let reference = Self {
            output: prompt.reference_output(),
            schema: prompt.metadata.expected_schema.as_ref(),
            min_chars: prompt.metadata.min_output_chars,
        };
        reference.is_present().then_some(reference)
    }

    fn is_present(&self) -> bool {
        self.output.is_some() || self.schema.is_some()
    }
}

/// Weight of a fresh score when blended with stored history.
pub const FRESH_SCORE_WEIGHT: f64 = 0.25;

/// Weight of the stored average when blended with a fresh score.
pub const HISTORY_WEIGHT: f64 = 0.15;

/// Weighted average of a fresh 0-100 score and the stored average for the
/// same prompt and model.
pub fn blend_with_history(fresh: f64, history: f64) -> f64 {
    let blended = (fresh * FRESH_SCORE_WEIGHT + history * HISTORY_WEIGHT)
        / (FRESH_SCORE_WEIGHT + HISTORY_WEIGHT);
    blended.clamp(0.0, 100.0)
}

/// Quality signal for a single output.
#[derive(Debug, Clone, PartialEq)]
pub struct QualitySignal {
    pub is_refusal: bool,
    /// 0-100, only when a reference exists.
    pub validation: Option<Validation>,
}

/// Pluggable per-output scoring strategy.
///
/// Scoring is async so implementations may consult a model (an LLM judge)
/// or another remote service before answering.
#[async_trait]
pub trait OutputScorer: Send + Sync {
    /// Short identifier recorded as the validation method.
    fn name(&self) -> &str;

    async fn score(&self, output: &str, reference: Option<&Reference<'_>>) -> QualitySignal;
}

/// Default scorer: refusal patterns plus heuristic validation.
#[derive(Debug, Clone, Default)]
pub struct HeuristicScorer {
    refusals: RefusalDetector,
    validator: HeuristicValidator,
}

impl HeuristicScorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_refusal_detector(mut self, refusals: RefusalDetector) -> Self {
        self.validator = HeuristicValidator::new(refusals.clone());
        self.refusals = refusals;
        self
    }
}

#[async_trait]
impl OutputScorer for HeuristicScorer {
    fn name(&self) -> &str {
        "heuristics"
    }

    async fn score(&self, output: &str, reference: Option<&Reference<'_>>) -> QualitySignal {
        QualitySignal {
            is_refusal: self.refusals.is_refusal(output),
            validation: reference.map(|r| self.validator.validate(output, r)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_no_reference_means_no_validation() {
        let scorer = HeuristicScorer::new();
        let signal = scorer.score("The answer is 4.", None).await;
        assert!(!signal.is_refusal);
        assert!(signal.validation.is_none());
    }

    #[tokio::test]
    async fn test_refusal_is_flagged_and_zeroed() {
        let scorer = HeuristicScorer::new();
        let reference = Reference {
            output: Some("The answer is 4."),
            ..Default::default()
        };
        let signal = scorer
            .score("I'm sorry, but I cannot help with that.", Some(&reference))
            .await;
        assert!(signal.is_refusal);
        assert_eq!(signal.validation.unwrap().score, 0.0);
    }

    #[test]
    fn test_history_blend_weights() {
        assert!((blend_with_history(80.0, 40.0) - 65.0).abs() < 1e-9);
        assert_eq!(blend_with_history(100.0, 100.0), 100.0);
        assert_eq!(blend_with_history(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_reference_from_prompt() {
        let prompt = Prompt::user("What is 2+2?");
        assert!(Reference::from_prompt(&prompt).is_none());

        let mut with_baseline = prompt.clone();
        with_baseline.baseline_output = Some("4".into());
        let reference = Reference::from_prompt(&with_baseline).unwrap();
        assert_eq!(reference.output, Some("4"));
    }
}
