//! Rule-based validation of an output against a reference (0-100).

use regex::RegexSet;

use super::{text_similarity, Reference, RefusalDetector, ScoreConfidence};

const DEFAULT_MIN_CHARS: usize = 10;
const SHORT_OUTPUT_PENALTY: f64 = 40.0;
const ERROR_MARKER_PENALTY: f64 = 30.0;
const SCHEMA_MISS_PENALTY: f64 = 20.0;
const SCHEMA_MATCH_BONUS: f64 = 10.0;
/// Share of the final score taken by similarity to the reference output.
const REFERENCE_SIMILARITY_WEIGHT: f64 = 0.5;

const ERROR_PATTERNS: &[&str] = &[
    r"(?i)\berror:",
    r"(?i)\bexception:",
    r"(?i)\btraceback\b",
    r"(?i)\bstack trace\b",
];

/// Result of validating one output.
#[derive(Debug, Clone, PartialEq)]
pub struct Validation {
    pub score: f64,
    pub confidence: ScoreConfidence,
    pub checks_passed: Vec<&'static str>,
    pub checks_failed: Vec<&'static str>,
}

impl Validation {
    fn critical(check: &'static str) -> Self {
        Self {
            score: 0.0,
            confidence: ScoreConfidence::High,
            checks_passed: Vec::new(),
            checks_failed: vec![check],
        }
    }
}

/// Fast checks that need no model call.
#[derive(Debug, Clone)]
pub struct HeuristicValidator {
    refusals: RefusalDetector,
    error_markers: RegexSet,
}

impl HeuristicValidator {
    pub fn new(refusals: RefusalDetector) -> Self {
        Self {
            refusals,
            error_markers: RegexSet::new(ERROR_PATTERNS).unwrap_or_else(|_| RegexSet::empty()),
        }
    }

    pub fn validate(&self, output: &str, reference: &Reference<'_>) -> Validation {
        if output.trim().is_empty() {
            return Validation::critical("non_empty");
        }
        if self.refusals.is_refusal(output) {
            return Validation::critical("refusal_check");
        }

        let mut score = 100.0;
        let mut passed = vec!["non_empty", "refusal_check"];
        let mut failed = Vec::new();

        let min_chars = reference.min_chars.unwrap_or(DEFAULT_MIN_CHARS);
        if output.trim().chars().count() < min_chars {
            score -= SHORT_OUTPUT_PENALTY;
            failed.push("length_check");
        } else {
            passed.push("length_check");
        }

        if self.error_markers.is_match(output) {
            score -= ERROR_MARKER_PENALTY;
            failed.push("error_check");
        } else {
            passed.push("error_check");
        }

        if let Some(schema) = reference.schema {
            if matches_schema(output, schema) {
                score += SCHEMA_MATCH_BONUS;
                passed.push("schema_check");
            } else {
                score -= SCHEMA_MISS_PENALTY;
                failed.push("schema_check");
            }
        }

        let mut score = clamp_score(score);

        if let Some(expected) = reference.output {
            let similarity = text_similarity(output, expected) * 100.0;
            score = (1.0 - REFERENCE_SIMILARITY_WEIGHT) * score
                + REFERENCE_SIMILARITY_WEIGHT * similarity;
            if similarity >= 50.0 {
                passed.push("reference_similarity");
            } else {
                failed.push("reference_similarity");
            }
        }

        let score = clamp_score(score);
        Validation {
            score,
            confidence: confidence_for(score),
            checks_passed: passed,
            checks_failed: failed,
        }
    }
}

impl Default for HeuristicValidator {
    fn default() -> Self {
        Self::new(RefusalDetector::default())
    }
}

fn clamp_score(score: f64) -> f64 {
    score.clamp(0.0, 100.0)
}

/// Scores near the extremes are unambiguous; the middle band is a judgement call.
fn confidence_for(score: f64) -> ScoreConfidence {
    if !(20.0..=85.0).contains(&score) {
        ScoreConfidence::High
    } else if (30.0..=75.0).contains(&score) {
        ScoreConfidence::Medium
    } else {
        ScoreConfidence::Low
    }
}

/// Whether `output` is a JSON object holding every key in `schema.required`.
///
/// Markdown code fences around the JSON are tolerated.
fn matches_schema(output: &str, schema: &serde_json::Value) -> bool {
    let body = output.trim();
    let body = body
        .strip_prefix("```json")
        .or_else(|| body.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(body)
        .trim();

    let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(body)
    else {
        return false;
    };

    schema
        .get("required")
        .and_then(|r| r.as_array())
        .map(|keys| {
            keys.iter()
                .filter_map(|k| k.as_str())
                .all(|k| map.contains_key(k))
        })
        .unwrap_or(true)
}
