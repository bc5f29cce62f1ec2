//! Per-model aggregation of replay results.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::consistency_score;
use crate::types::ReplayResult;

/// Aggregated metrics for one model across the batch.
///
/// # Invariants
/// - `successful_calls <= total_calls`
/// - cost and latency figures cover successful calls only; all zero when
///   there are none
/// - `consistency_score` is in [0, 1]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSummary {
    pub model: String,
    pub total_calls: usize,
    pub successful_calls: usize,
    pub failed_calls: usize,
    pub success_rate: f64,
    /// Share of all calls that were refusals.
    pub refusal_rate: f64,

    pub avg_cost_per_call: f64,
    pub total_cost: f64,

    pub avg_latency_ms: f64,
    pub p50_latency_ms: f64,
    pub p95_latency_ms: f64,

    pub consistency_score: f64,
    /// Mean of the non-null validation scores, absent when none were produced.
    pub avg_validation_score: Option<f64>,
    pub validated_calls: usize,

    /// At least one cost came from a fallback price tier.
    pub pricing_estimated: bool,
}

impl ModelSummary {
    pub fn has_successes(&self) -> bool {
        self.successful_calls > 0
    }
}

/// Percentile of `values` (`p` in [0, 1]) with linear interpolation between
/// order statistics. Returns 0 for an empty sample.
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = p.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Aggregate results into one summary per model, keyed by model id.
///
/// Every model in `models` gets an entry, even one whose calls all failed.
pub fn summarize(results: &[ReplayResult], models: &[String]) -> BTreeMap<String, ModelSummary> {
    let mut by_model: BTreeMap<&str, Vec<&ReplayResult>> =
        models.iter().map(|m| (m.as_str(), Vec::new())).collect();
    for result in results {
        by_model.entry(result.model.as_str()).or_default().push(result);
    }

    by_model
        .into_iter()
        .map(|(model, results)| (model.to_string(), summarize_model(model, &results)))
        .collect()
}

fn summarize_model(model: &str, results: &[&ReplayResult]) -> ModelSummary {
    let total_calls = results.len();
    let successful: Vec<&ReplayResult> = results.iter().copied().filter(|r| r.success).collect();
    let successful_calls = successful.len();
    let refusals = successful.iter().filter(|r| r.is_refusal).count();

    let ratio = |n: usize| {
        if total_calls == 0 {
            0.0
        } else {
            n as f64 / total_calls as f64
        }
    };

    let costs: Vec<f64> = successful.iter().map(|r| r.cost_usd.max(0.0)).collect();
    let latencies: Vec<f64> = successful.iter().map(|r| r.latency_ms.max(0.0)).collect();
    let validation_scores: Vec<f64> = successful
        .iter()
        .filter_map(|r| r.validation_score)
        .collect();

    ModelSummary {
        model: model.to_string(),
        total_calls,
        successful_calls,
        failed_calls: total_calls - successful_calls,
        success_rate: ratio(successful_calls),
        refusal_rate: ratio(refusals),
        avg_cost_per_call: mean(&costs),
        total_cost: costs.iter().sum(),
        avg_latency_ms: mean(&latencies),
        p50_latency_ms: percentile(&latencies, 0.50),
        p95_latency_ms: percentile(&latencies, 0.95),
        consistency_score: consistency_score(successful.iter().copied()),
        avg_validation_score: (!validation_scores.is_empty()).then(|| mean(&validation_scores)),
        validated_calls: validation_scores.len(),
        pricing_estimated: successful.iter().any(|r| r.cost_estimated),
    }
}
