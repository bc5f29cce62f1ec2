//! Recommendation engine - picks a substitute for the baseline model.
//!
//! # Strategy
//! 1. Baseline: explicit, or the most expensive model with a successful call
//! 2. Candidates: optimal frontier points cheaper than the baseline that keep
//!    at least `min_quality_retention` of its quality
//! 3. Pick the candidate with the largest savings
//! 4. Grade confidence and attach risks from rule checks

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::frontier::{composite_quality, optimal_points, ParetoPoint};
use crate::scoring::ModelSummary;

/// Minimum share of the baseline's quality a substitute must keep.
pub const MIN_QUALITY_RETENTION: f64 = 0.90;
/// Calls needed for a HIGH confidence recommendation.
pub const HIGH_CONFIDENCE_MIN_CALLS: usize = 50;
/// Calls needed for a MEDIUM confidence recommendation.
pub const MEDIUM_CONFIDENCE_MIN_CALLS: usize = 20;
/// Success rate both models need for HIGH confidence.
pub const HIGH_RELIABILITY_FLOOR: f64 = 0.90;
/// Success rate both models need for MEDIUM confidence.
pub const MEDIUM_RELIABILITY_FLOOR: f64 = 0.80;

/// Coarse reliability label of a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

/// Thresholds used to select, grade and risk-check a recommendation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecommendationPolicy {
    pub min_quality_retention: f64,
    pub high_confidence_min_calls: usize,
    pub medium_confidence_min_calls: usize,
    pub high_reliability_floor: f64,
    pub medium_reliability_floor: f64,
    /// Candidate latency above this multiple of the baseline is a regression.
    pub latency_regression_factor: f64,
    /// Candidate refusal rate above this multiple of the baseline is flagged.
    pub refusal_regression_factor: f64,
    /// Fewer calls than this is flagged as a small sample.
    pub small_sample_calls: usize,
    /// Validation drop (0-100 points) that is flagged.
    pub validation_drop_points: f64,
    /// Candidate consistency below this share of the baseline is flagged.
    pub consistency_floor_ratio: f64,
}

impl Default for RecommendationPolicy {
    fn default() -> Self {
        Self {
            min_quality_retention: MIN_QUALITY_RETENTION,
            high_confidence_min_calls: HIGH_CONFIDENCE_MIN_CALLS,
            medium_confidence_min_calls: MEDIUM_CONFIDENCE_MIN_CALLS,
            high_reliability_floor: HIGH_RELIABILITY_FLOOR,
            medium_reliability_floor: MEDIUM_RELIABILITY_FLOOR,
            latency_regression_factor: 1.5,
            refusal_regression_factor: 2.0,
            small_sample_calls: 30,
            validation_drop_points: 10.0,
            consistency_floor_ratio: 0.9,
        }
    }
}

/// Recommended model with its justification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub baseline_model: String,
    pub recommended_model: String,
    pub cost_savings_pct: f64,
    pub cost_savings_usd_per_1k: f64,
    pub quality_retention_pct: f64,
    /// Baseline quality was zero, so retention could not be measured.
    pub retention_indeterminate: bool,
    pub confidence: Confidence,
    pub reasoning: String,
    pub risks: Vec<String>,
    pub tested_on_calls: usize,
}

/// Savings of `candidate_cost` against `baseline_cost`, in percent.
pub fn cost_savings_pct(baseline_cost: f64, candidate_cost: f64) -> f64 {
    if baseline_cost <= 0.0 {
        0.0
    } else {
        (baseline_cost - candidate_cost) / baseline_cost * 100.0
    }
}

/// Share of the baseline's quality kept by the candidate, in percent.
///
/// Returns `None` when the baseline quality is zero.
pub fn quality_retention_pct(baseline_quality: f64, candidate_quality: f64) -> Option<f64> {
    (baseline_quality > 0.0).then(|| candidate_quality / baseline_quality * 100.0)
}

/// Pick the baseline: the explicit model if given, else the most expensive
/// model with at least one success (ties broken by model id).
pub fn select_baseline<'a>(
    summaries: &'a BTreeMap<String, ModelSummary>,
    explicit: Option<&str>,
) -> Option<&'a ModelSummary> {
    if let Some(model) = explicit {
        return summaries.get(model);
    }

    summaries
        .values()
        .filter(|s| s.has_successes())
        .max_by(|a, b| {
            a.avg_cost_per_call
                .partial_cmp(&b.avg_cost_per_call)
                .unwrap_or(Ordering::Equal)
                // max_by keeps the last maximum; reverse so the smaller id wins ties
                .then_with(|| b.model.cmp(&a.model))
        })
        .or_else(|| summaries.values().next())
}

struct Candidate<'a> {
    point: &'a ParetoPoint,
    summary: &'a ModelSummary,
    savings_pct: f64,
    retention_pct: f64,
}

/// Builds recommendations under a [`RecommendationPolicy`].
#[derive(Debug, Clone, Default)]
pub struct RecommendationEngine {
    policy: RecommendationPolicy,
}

impl RecommendationEngine {
    pub fn new(policy: RecommendationPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RecommendationPolicy {
        &self.policy
    }

    /// Generate the recommendation for a batch.
    ///
    /// `frontier` must come from [`build_frontier`](crate::frontier::build_frontier)
    /// over the same `summaries`. Returns `None` only when there is no
    /// baseline to compare against: `summaries` is empty or does not contain
    /// `explicit_baseline`.
    pub fn recommend(
        &self,
        summaries: &BTreeMap<String, ModelSummary>,
        frontier: &[ParetoPoint],
        explicit_baseline: Option<&str>,
    ) -> Option<Recommendation> {
        let baseline = select_baseline(summaries, explicit_baseline)?;

        if !baseline.has_successes() || frontier.is_empty() {
            return Some(self.insufficient_data(baseline));
        }

        let baseline_quality = composite_quality(baseline);
        let baseline_cost = baseline.avg_cost_per_call;
        let min_retention_pct = self.policy.min_quality_retention * 100.0;

        let best = optimal_points(frontier)
            .filter(|p| p.model != baseline.model && p.cost < baseline_cost)
            .filter_map(|point| {
                let summary = summaries.get(&point.model)?;
                let retention_pct =
                    quality_retention_pct(baseline_quality, point.quality).unwrap_or(100.0);
                (retention_pct >= min_retention_pct).then(|| Candidate {
                    point,
                    summary,
                    savings_pct: cost_savings_pct(baseline_cost, point.cost),
                    retention_pct,
                })
            })
            .max_by(|a, b| {
                a.savings_pct
                    .partial_cmp(&b.savings_pct)
                    .unwrap_or(Ordering::Equal)
                    .then_with(|| {
                        a.point
                            .quality
                            .partial_cmp(&b.point.quality)
                            .unwrap_or(Ordering::Equal)
                    })
                    .then_with(|| b.point.model.cmp(&a.point.model))
            });

        let Some(best) = best else {
            return Some(self.keep_baseline(baseline));
        };

        let retention_indeterminate = baseline_quality <= 0.0;
        let tested_on_calls = best.summary.total_calls;
        let mut risks = self.identify_risks(best.summary, baseline);
        if retention_indeterminate {
            risks.push(format!(
                "Baseline {} scored zero quality; retention could not be measured",
                baseline.model
            ));
        }

        let reasoning = format!(
            "{} offers {:.1}% cost savings while retaining {:.1}% of {}'s quality. \
             Validated on {} replayed calls with a {:.1}% success rate.",
            best.point.model,
            best.savings_pct,
            best.retention_pct,
            baseline.model,
            tested_on_calls,
            best.summary.success_rate * 100.0
        );

        info!(
            "Recommending {} over {} ({:.1}% savings, {:.1}% quality retention)",
            best.point.model, baseline.model, best.savings_pct, best.retention_pct
        );

        Some(Recommendation {
            baseline_model: baseline.model.clone(),
            recommended_model: best.point.model.clone(),
            cost_savings_pct: best.savings_pct,
            cost_savings_usd_per_1k: (baseline_cost - best.point.cost) * 1000.0,
            quality_retention_pct: best.retention_pct,
            retention_indeterminate,
            confidence: self.grade(tested_on_calls, &[best.summary, baseline]),
            reasoning,
            risks,
            tested_on_calls,
        })
    }

    fn keep_baseline(&self, baseline: &ModelSummary) -> Recommendation {
        info!("No safe substitute for {}", baseline.model);
        let mut risks = Vec::new();
        if baseline.total_calls < self.policy.small_sample_calls {
            risks.push(small_sample_risk(baseline));
        }
        if baseline.pricing_estimated {
            risks.push(estimated_pricing_risk(baseline));
        }

        Recommendation {
            baseline_model: baseline.model.clone(),
            recommended_model: baseline.model.clone(),
            cost_savings_pct: 0.0,
            cost_savings_usd_per_1k: 0.0,
            quality_retention_pct: 100.0,
            retention_indeterminate: false,
            confidence: self.grade(baseline.total_calls, &[baseline]),
            reasoning: format!(
                "no safe substitute found: no cheaper model retains at least {:.0}% of {}'s quality",
                self.policy.min_quality_retention * 100.0,
                baseline.model
            ),
            risks,
            tested_on_calls: baseline.total_calls,
        }
    }

    fn insufficient_data(&self, baseline: &ModelSummary) -> Recommendation {
        info!("Insufficient data to recommend a substitute for {}", baseline.model);
        Recommendation {
            baseline_model: baseline.model.clone(),
            recommended_model: baseline.model.clone(),
            cost_savings_pct: 0.0,
            cost_savings_usd_per_1k: 0.0,
            quality_retention_pct: 100.0,
            retention_indeterminate: true,
            confidence: Confidence::Low,
            reasoning: format!(
                "insufficient data: {} completed {} of {} calls",
                baseline.model, baseline.successful_calls, baseline.total_calls
            ),
            risks: Vec::new(),
            tested_on_calls: baseline.total_calls,
        }
    }

    fn grade(&self, calls: usize, models: &[&ModelSummary]) -> Confidence {
        let all_above = |floor: f64| models.iter().all(|m| m.success_rate >= floor);

        if calls >= self.policy.high_confidence_min_calls
            && all_above(self.policy.high_reliability_floor)
        {
            Confidence::High
        } else if calls >= self.policy.medium_confidence_min_calls
            && all_above(self.policy.medium_reliability_floor)
        {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }

    /// Risks from rule checks that fired; empty when none did.
    fn identify_risks(&self, candidate: &ModelSummary, baseline: &ModelSummary) -> Vec<String> {
        let policy = &self.policy;
        let mut risks = Vec::new();

        let avg_regressed = baseline.avg_latency_ms > 0.0
            && candidate.avg_latency_ms > baseline.avg_latency_ms * policy.latency_regression_factor;
        let p95_regressed = baseline.p95_latency_ms > 0.0
            && candidate.p95_latency_ms > baseline.p95_latency_ms * policy.latency_regression_factor;
        if avg_regressed || p95_regressed {
            risks.push(format!(
                "Latency increase: {:.0}ms avg / {:.0}ms p95 vs {:.0}ms / {:.0}ms baseline",
                candidate.avg_latency_ms,
                candidate.p95_latency_ms,
                baseline.avg_latency_ms,
                baseline.p95_latency_ms
            ));
        }

        if candidate.refusal_rate > 0.0
            && candidate.refusal_rate > baseline.refusal_rate * policy.refusal_regression_factor
        {
            risks.push(format!(
                "Higher refusal rate: {:.1}% vs {:.1}% baseline",
                candidate.refusal_rate * 100.0,
                baseline.refusal_rate * 100.0
            ));
        }

        if candidate.total_calls < policy.small_sample_calls {
            risks.push(small_sample_risk(candidate));
        }

        if let (Some(candidate_validation), Some(baseline_validation)) =
            (candidate.avg_validation_score, baseline.avg_validation_score)
        {
            if baseline_validation - candidate_validation > policy.validation_drop_points {
                risks.push(format!(
                    "Validation score drop: {:.1} vs {:.1} baseline",
                    candidate_validation, baseline_validation
                ));
            }
        }

        if candidate.consistency_score < baseline.consistency_score * policy.consistency_floor_ratio
        {
            risks.push(format!(
                "Lower output consistency: {:.2} vs {:.2} baseline",
                candidate.consistency_score, baseline.consistency_score
            ));
        }

        for summary in [candidate, baseline] {
            if summary.pricing_estimated {
                risks.push(estimated_pricing_risk(summary));
            }
        }

        risks
    }
}

fn small_sample_risk(summary: &ModelSummary) -> String {
    format!(
        "Limited test sample: only {} calls analyzed for {}",
        summary.total_calls, summary.model
    )
}

fn estimated_pricing_risk(summary: &ModelSummary) -> String {
    format!(
        "Cost for {} is estimated: no published price was found",
        summary.model
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontier::build_frontier;

    fn summary(model: &str, calls: usize, cost: f64, quality: f64) -> ModelSummary {
        ModelSummary {
            model: model.to_string(),
            total_calls: calls,
            successful_calls: calls,
            failed_calls: 0,
            success_rate: if calls > 0 { 1.0 } else { 0.0 },
            refusal_rate: 0.0,
            avg_cost_per_call: cost,
            total_cost: cost * calls as f64,
            avg_latency_ms: 500.0,
            p50_latency_ms: 480.0,
            p95_latency_ms: 700.0,
            consistency_score: quality,
            avg_validation_score: None,
            validated_calls: 0,
            pricing_estimated: false,
        }
    }

    fn map(summaries: Vec<ModelSummary>) -> BTreeMap<String, ModelSummary> {
        summaries.into_iter().map(|s| (s.model.clone(), s)).collect()
    }

    fn recommend(summaries: &BTreeMap<String, ModelSummary>) -> Recommendation {
        let frontier = build_frontier(summaries);
        RecommendationEngine::default()
            .recommend(summaries, &frontier, None)
            .unwrap()
    }

    #[test]
    fn test_cheaper_model_clearing_threshold_is_recommended() {
        let summaries = map(vec![
            summary("modelA", 60, 0.001, 0.95),
            summary("modelB", 60, 0.0003, 0.90),
        ]);
        let rec = recommend(&summaries);

        assert_eq!(rec.baseline_model, "modelA");
        assert_eq!(rec.recommended_model, "modelB");
        assert!((rec.quality_retention_pct - 0.90 / 0.95 * 100.0).abs() < 1e-9);
        assert!((rec.cost_savings_pct - 70.0).abs() < 1e-9);
        assert!((rec.cost_savings_usd_per_1k - 0.7).abs() < 1e-9);
        assert_eq!(rec.confidence, Confidence::High);
        assert!(rec.risks.is_empty(), "{:?}", rec.risks);
    }

    #[test]
    fn test_threshold_failure_keeps_baseline() {
        let summaries = map(vec![
            summary("modelA", 60, 0.001, 0.95),
            summary("modelB", 60, 0.0003, 0.80),
        ]);
        let rec = recommend(&summaries);

        assert_eq!(rec.recommended_model, "modelA");
        assert!(rec.reasoning.starts_with("no safe substitute found"));
        assert_eq!(rec.cost_savings_pct, 0.0);
        assert_eq!(rec.quality_retention_pct, 100.0);
    }

    #[test]
    fn test_reported_figures_match_summaries() {
        let summaries = map(vec![
            summary("big", 40, 0.004, 0.92),
            summary("mid", 40, 0.002, 0.90),
            summary("small", 40, 0.0005, 0.85),
        ]);
        let rec = recommend(&summaries);

        let baseline = &summaries[&rec.baseline_model];
        let chosen = &summaries[&rec.recommended_model];
        let savings = cost_savings_pct(baseline.avg_cost_per_call, chosen.avg_cost_per_call);
        let retention =
            quality_retention_pct(composite_quality(baseline), composite_quality(chosen)).unwrap();

        assert_eq!(rec.recommended_model, "small");
        assert!((rec.cost_savings_pct - savings).abs() < 1e-9);
        assert!((rec.quality_retention_pct - retention).abs() < 1e-9);
        assert_eq!(rec.confidence, Confidence::Medium);
    }

    #[test]
    fn test_dead_baseline_means_insufficient_data() {
        let mut dead = summary("expensive", 5, 0.0, 0.0);
        dead.successful_calls = 0;
        dead.failed_calls = 5;
        dead.success_rate = 0.0;
        let summaries = map(vec![dead, summary("cheap", 5, 0.0001, 0.9)]);
        let frontier = build_frontier(&summaries);

        let rec = RecommendationEngine::default()
            .recommend(&summaries, &frontier, Some("expensive"))
            .unwrap();
        assert_eq!(rec.recommended_model, "expensive");
        assert!(rec.reasoning.starts_with("insufficient data"));
        assert_eq!(rec.confidence, Confidence::Low);
    }

    #[test]
    fn test_zero_quality_baseline_is_indeterminate() {
        let summaries = map(vec![
            summary("broken", 60, 0.002, 0.0),
            summary("cheap", 60, 0.001, 0.0),
        ]);
        let rec = recommend(&summaries);

        assert_eq!(rec.recommended_model, "cheap");
        assert!(rec.retention_indeterminate);
        assert_eq!(rec.quality_retention_pct, 100.0);
        assert!(rec.risks.iter().any(|r| r.contains("zero quality")));
    }

    #[test]
    fn test_risks_only_from_fired_rules() {
        let mut baseline = summary("base", 10, 0.002, 0.9);
        baseline.avg_validation_score = Some(90.0);
        let mut candidate = summary("cand", 10, 0.001, 0.9);
        candidate.avg_latency_ms = 2000.0;
        candidate.refusal_rate = 0.2;
        candidate.avg_validation_score = Some(60.0);

        let engine = RecommendationEngine::default();
        let risks = engine.identify_risks(&candidate, &baseline);
        assert_eq!(risks.len(), 4, "{:?}", risks);
        assert!(risks[0].starts_with("Latency increase"));
        assert!(risks[1].starts_with("Higher refusal rate"));
        assert!(risks[2].starts_with("Limited test sample"));
        assert!(risks[3].starts_with("Validation score drop"));

        let quiet = engine.identify_risks(&summary("c", 100, 0.001, 0.9), &summary("b", 100, 0.002, 0.9));
        assert!(quiet.is_empty());
    }

    #[test]
    fn test_consistency_drop_is_a_risk() {
        let baseline = summary("base", 100, 0.002, 0.9);
        let candidate = summary("cand", 100, 0.001, 0.5);

        let risks = RecommendationEngine::default().identify_risks(&candidate, &baseline);
        assert_eq!(risks.len(), 1, "{:?}", risks);
        assert!(risks[0].starts_with("Lower output consistency: 0.50 vs 0.90"));
    }

    #[test]
    fn test_estimated_pricing_is_a_risk() {
        let baseline = summary("base", 100, 0.002, 0.9);
        let mut candidate = summary("cand", 100, 0.001, 0.9);
        candidate.pricing_estimated = true;

        let engine = RecommendationEngine::default();
        let risks = engine.identify_risks(&candidate, &baseline);
        assert_eq!(
            risks,
            vec!["Cost for cand is estimated: no published price was found".to_string()]
        );

        let summaries = map(vec![baseline, candidate]);
        let rec = recommend(&summaries);
        assert_eq!(rec.recommended_model, "cand");
        assert_eq!(rec.risks, risks);
    }

    #[test]
    fn test_no_baseline_means_no_recommendation() {
        let engine = RecommendationEngine::default();
        assert!(engine.recommend(&BTreeMap::new(), &[], None).is_none());

        let summaries = map(vec![summary("a", 5, 0.002, 0.9), summary("b", 5, 0.001, 0.9)]);
        let frontier = build_frontier(&summaries);
        assert!(engine.recommend(&summaries, &frontier, Some("z")).is_none());
    }

    #[test]
    fn test_confidence_grading() {
        let engine = RecommendationEngine::default();
        let solid = summary("a", 60, 0.001, 0.9);
        let mut shaky = summary("b", 60, 0.001, 0.9);
        shaky.success_rate = 0.85;

        assert_eq!(engine.grade(60, &[&solid, &solid]), Confidence::High);
        assert_eq!(engine.grade(60, &[&solid, &shaky]), Confidence::Medium);
        assert_eq!(engine.grade(10, &[&solid, &solid]), Confidence::Low);
    }

    #[test]
    fn test_default_baseline_is_most_expensive() {
        let summaries = map(vec![
            summary("a", 5, 0.002, 0.9),
            summary("b", 5, 0.002, 0.9),
            summary("c", 5, 0.001, 0.9),
        ]);
        assert_eq!(select_baseline(&summaries, None).unwrap().model, "a");
        assert_eq!(select_baseline(&summaries, Some("c")).unwrap().model, "c");
    }
}
