//! Output consistency across repeated invocations of the same prompt.

use std::collections::BTreeMap;

use crate::types::ReplayResult;

/// Consistency of a prompt that was only answered once.
///
/// A lone sample has nothing to disagree with, so it is treated as fully
/// consistent rather than penalized.
pub const SINGLE_SAMPLE_CONSISTENCY: f64 = 1.0;

/// Similarity of two outputs in [0, 1], insensitive to case and whitespace.
pub fn text_similarity(a: &str, b: &str) -> f64 {
    let normalize = |s: &str| s.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    strsim::sorensen_dice(&normalize(a), &normalize(b)).clamp(0.0, 1.0)
}

/// Mean pairwise similarity of the outputs produced for one prompt.
pub fn group_consistency(outputs: &[&str]) -> f64 {
    if outputs.len() < 2 {
        return SINGLE_SAMPLE_CONSISTENCY;
    }

    let mut total = 0.0;
    let mut pairs = 0usize;
    for (i, a) in outputs.iter().enumerate() {
        for b in &outputs[i + 1..] {
            total += text_similarity(a, b);
            pairs += 1;
        }
    }
    total / pairs as f64
}

/// Consistency score of one model from its results.
///
/// Successful outputs are grouped by prompt fingerprint and the group
/// consistencies averaged; the mean is then scaled by the share of successful
/// calls that were not refusals. Returns 0 when the model has no successes.
pub fn consistency_score<'a, I>(results: I) -> f64
where
    I: IntoIterator<Item = &'a ReplayResult>,
{
    let mut groups: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    let mut successes = 0usize;
    let mut refusals = 0usize;

    for result in results.into_iter().filter(|r| r.success) {
        successes += 1;
        if result.is_refusal {
            refusals += 1;
        }
        groups
            .entry(result.prompt_hash.as_str())
            .or_default()
            .push(result.output.as_deref().unwrap_or_default());
    }

    if successes == 0 {
        return 0.0;
    }

    let raw = groups.values().map(|g| group_consistency(g)).sum::<f64>() / groups.len() as f64;
    let answered = 1.0 - refusals as f64 / successes as f64;
    (raw * answered).clamp(0.0, 1.0)
}
