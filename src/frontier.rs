//! Pareto frontier over per-model (cost, quality) points.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::scoring::ModelSummary;

/// Weight of the consistency score in the composite quality.
pub const CONSISTENCY_WEIGHT: f64 = 0.5;
/// Weight of the (normalized) validation score in the composite quality.
pub const VALIDATION_WEIGHT: f64 = 0.5;

/// A model's position in the cost/quality plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParetoPoint {
    pub model: String,
    /// Average cost per successful call, USD.
    pub cost: f64,
    /// Composite quality in [0, 1].
    pub quality: f64,
    pub is_optimal: bool,
}

/// Composite quality of a model in [0, 1].
///
/// `CONSISTENCY_WEIGHT * consistency + VALIDATION_WEIGHT * validation / 100`
/// when the model has validation scores, consistency alone otherwise.
pub fn composite_quality(summary: &ModelSummary) -> f64 {
    let quality = match summary.avg_validation_score {
        Some(validation) => {
            CONSISTENCY_WEIGHT * summary.consistency_score
                + VALIDATION_WEIGHT * (validation / 100.0)
        }
        None => summary.consistency_score,
    };
    quality.clamp(0.0, 1.0)
}

/// Whether `a` dominates `b`: no worse on both axes, strictly better on one.
pub fn dominates(a: &ParetoPoint, b: &ParetoPoint) -> bool {
    a.cost <= b.cost && a.quality >= b.quality && (a.cost < b.cost || a.quality > b.quality)
}

/// Build the annotated point set.
///
/// Models without a successful call have no defined quality and are left
/// out. Every remaining point is marked optimal unless another point
/// dominates it; identical points are co-optimal. Points are ordered by
/// ascending cost, then model id.
pub fn build_frontier(summaries: &BTreeMap<String, ModelSummary>) -> Vec<ParetoPoint> {
    let mut points: Vec<ParetoPoint> = summaries
        .values()
        .filter(|s| s.has_successes())
        .map(|s| ParetoPoint {
            model: s.model.clone(),
            cost: s.avg_cost_per_call,
            quality: composite_quality(s),
            is_optimal: false,
        })
        .collect();

    let dominated: Vec<bool> = points
        .iter()
        .enumerate()
        .map(|(i, point)| {
            points
                .iter()
                .enumerate()
                .any(|(j, other)| i != j && dominates(other, point))
        })
        .collect();

    for (point, dominated) in points.iter_mut().zip(dominated) {
        point.is_optimal = !dominated;
    }

    points.sort_by(|a, b| {
        a.cost
            .partial_cmp(&b.cost)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.model.cmp(&b.model))
    });
    points
}

/// Only the non-dominated points, ascending cost.
pub fn optimal_points(points: &[ParetoPoint]) -> impl Iterator<Item = &ParetoPoint> {
    points.iter().filter(|p| p.is_optimal)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(model: &str, cost: f64, consistency: f64, validation: Option<f64>) -> ModelSummary {
        ModelSummary {
            model: model.to_string(),
            total_calls: 10,
            successful_calls: 10,
            failed_calls: 0,
            success_rate: 1.0,
            refusal_rate: 0.0,
            avg_cost_per_call: cost,
            total_cost: cost * 10.0,
            avg_latency_ms: 100.0,
            p50_latency_ms: 100.0,
            p95_latency_ms: 120.0,
            consistency_score: consistency,
            avg_validation_score: validation,
            validated_calls: if validation.is_some() { 10 } else { 0 },
            pricing_estimated: false,
        }
    }

    fn map(summaries: Vec<ModelSummary>) -> BTreeMap<String, ModelSummary> {
        summaries.into_iter().map(|s| (s.model.clone(), s)).collect()
    }

    fn point(model: &str, cost: f64, quality: f64) -> ParetoPoint {
        ParetoPoint {
            model: model.into(),
            cost,
            quality,
            is_optimal: false,
        }
    }

    #[test]
    fn test_composite_weights() {
        assert_eq!(composite_quality(&summary("a", 1.0, 0.8, None)), 0.8);
        let blended = composite_quality(&summary("a", 1.0, 0.8, Some(60.0)));
        assert!((blended - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_dominance_requires_strict_improvement() {
        assert!(dominates(&point("a", 1.0, 0.9), &point("b", 2.0, 0.9)));
        assert!(dominates(&point("a", 1.0, 0.9), &point("b", 1.0, 0.8)));
        assert!(!dominates(&point("a", 1.0, 0.9), &point("b", 1.0, 0.9)));
        assert!(!dominates(&point("a", 1.0, 0.8), &point("b", 2.0, 0.9)));
    }

    #[test]
    fn test_dominance_law_holds_for_every_pair() {
        let summaries = map(vec![
            summary("a", 0.001, 0.95, None),
            summary("b", 0.0003, 0.90, None),
            summary("c", 0.0005, 0.85, None),
            summary("d", 0.002, 0.95, None),
            summary("e", 0.0003, 0.90, None),
        ]);
        let points = build_frontier(&summaries);

        for a in &points {
            for b in &points {
                if dominates(a, b) {
                    assert!(!b.is_optimal, "{} dominates {}", a.model, b.model);
                }
            }
        }
        let optimal: Vec<_> = optimal_points(&points).map(|p| p.model.as_str()).collect();
        assert_eq!(optimal, vec!["b", "e", "a"]);
    }

    #[test]
    fn test_cost_quality_tradeoff_both_optimal() {
        let summaries = map(vec![
            summary("modelA", 0.001, 0.95, None),
            summary("modelB", 0.0003, 0.90, None),
        ]);
        let points = build_frontier(&summaries);
        assert_eq!(points[0].model, "modelB");
        assert_eq!(points[1].model, "modelA");
        assert!(points.iter().all(|p| p.is_optimal));
    }

    #[test]
    fn test_zero_success_model_excluded() {
        let mut dead = summary("dead", 0.0, 0.0, None);
        dead.successful_calls = 0;
        dead.success_rate = 0.0;
        let summaries = map(vec![dead, summary("alive", 0.001, 0.9, None)]);

        let points = build_frontier(&summaries);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].model, "alive");
        assert!(points[0].is_optimal);
    }
}
