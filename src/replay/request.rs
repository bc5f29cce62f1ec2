//! Boundary checks run before any call is scheduled.

use std::collections::HashSet;

use super::ReplayError;
use crate::llm::LlmGateway;
use crate::types::{GenerationConfig, ReplayRequest};

/// Reject a request that cannot produce a meaningful comparison.
///
/// Structural problems are reported before model support, so a malformed
/// request never reaches the gateway at all.
pub fn validate_request(
    request: &ReplayRequest,
    gateway: &dyn LlmGateway,
) -> Result<(), ReplayError> {
    let invalid = |msg: String| Err(ReplayError::InvalidRequest(msg));

    if request.prompts.is_empty() {
        return invalid("at least one prompt is required".to_string());
    }
    if let Some(index) = request.prompts.iter().position(|p| p.messages.is_empty()) {
        return invalid(format!("prompt {} has no messages", index));
    }

    let mut seen = HashSet::new();
    for model in &request.models {
        if model.trim().is_empty() {
            return invalid("model ids must not be empty".to_string());
        }
        if !seen.insert(model.as_str()) {
            return invalid(format!("model {} is listed more than once", model));
        }
    }
    if seen.len() < 2 {
        return invalid(format!(
            "at least two distinct models are required, got {}",
            seen.len()
        ));
    }

    let generation = &request.generation;
    if !(0.0..=GenerationConfig::MAX_TEMPERATURE).contains(&generation.temperature) {
        return invalid(format!(
            "temperature must be within [0, {}], got {}",
            GenerationConfig::MAX_TEMPERATURE,
            generation.temperature
        ));
    }
    if !(1..=GenerationConfig::MAX_OUTPUT_TOKENS).contains(&generation.max_tokens) {
        return invalid(format!(
            "max_tokens must be within [1, {}], got {}",
            GenerationConfig::MAX_OUTPUT_TOKENS,
            generation.max_tokens
        ));
    }

    if let Some(baseline) = &request.baseline_model {
        if !seen.contains(baseline.as_str()) {
            return invalid(format!(
                "baseline model {} is not among the requested models",
                baseline
            ));
        }
    }

    let unsupported: Vec<String> = request
        .models
        .iter()
        .filter(|m| !gateway.supports_model(m))
        .cloned()
        .collect();
    if !unsupported.is_empty() {
        return Err(ReplayError::UnsupportedModels(unsupported));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ScriptedGateway, ScriptedResponse};
    use crate::types::Prompt;
    use tokio_test::{assert_err, assert_ok};

    fn gateway() -> ScriptedGateway {
        ScriptedGateway::new()
            .with_model("gpt-4o", ScriptedResponse::reply("ok", 1, 1))
            .with_model("gpt-4o-mini", ScriptedResponse::reply("ok", 1, 1))
    }

    fn request(models: &[&str]) -> ReplayRequest {
        ReplayRequest::new(
            vec![Prompt::user("What is 2+2?")],
            models.iter().map(|m| m.to_string()).collect(),
        )
    }

    fn rejection(request: &ReplayRequest) -> String {
        match validate_request(request, &gateway()) {
            Err(ReplayError::InvalidRequest(msg)) => msg,
            other => panic!("expected InvalidRequest, got {:?}", other),
        }
    }

    #[test]
    fn test_valid_request_passes() {
        assert_ok!(validate_request(&request(&["gpt-4o", "gpt-4o-mini"]), &gateway()));
        let mut capped = request(&["gpt-4o", "gpt-4o-mini"]);
        capped.generation.temperature = 2.0;
        capped.generation.max_tokens = 4096;
        assert_ok!(validate_request(&capped, &gateway()));
    }

    #[test]
    fn test_model_count_and_duplicates() {
        assert!(rejection(&request(&["gpt-4o"])).contains("at least two"));
        assert!(rejection(&request(&["gpt-4o", "gpt-4o"])).contains("more than once"));
    }

    #[test]
    fn test_prompts_required() {
        let mut empty = request(&["gpt-4o", "gpt-4o-mini"]);
        empty.prompts.clear();
        assert!(rejection(&empty).contains("at least one prompt"));

        let mut silent = request(&["gpt-4o", "gpt-4o-mini"]);
        silent.prompts[0].messages.clear();
        assert!(rejection(&silent).contains("no messages"));
    }

    #[test]
    fn test_generation_ranges() {
        let mut hot = request(&["gpt-4o", "gpt-4o-mini"]);
        hot.generation.temperature = 2.5;
        assert!(rejection(&hot).contains("temperature"));

        let mut long = request(&["gpt-4o", "gpt-4o-mini"]);
        long.generation.max_tokens = 5000;
        assert!(rejection(&long).contains("max_tokens"));

        let mut zero = request(&["gpt-4o", "gpt-4o-mini"]);
        zero.generation.max_tokens = 0;
        assert!(rejection(&zero).contains("max_tokens"));
    }

    #[test]
    fn test_baseline_must_be_requested() {
        let request = request(&["gpt-4o", "gpt-4o-mini"]).with_baseline("claude-3-opus");
        assert!(rejection(&request).contains("baseline"));
    }

    #[test]
    fn test_unsupported_models_listed() {
        let err = assert_err!(validate_request(
            &request(&["gpt-4o", "ghost", "phantom"]),
            &gateway()
        ));
        assert_eq!(
            err,
            ReplayError::UnsupportedModels(vec![
                "ghost".to_string(),
                "phantom".to_string()
            ])
        );
    }
}
