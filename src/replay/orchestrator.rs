//! Replay orchestrator - top-level driver of a replay batch.
//!
//! # Responsibilities
//! 1. Validate the request before any call
//! 2. Replay every (prompt, model) pair under a concurrency bound
//! 3. Price, score and audit each successful call
//! 4. Aggregate into summaries, frontier and recommendation

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{validate_request, DegradedComponent, ReplayBundle, ReplayContext, ReplayError};
use crate::audit::{AuditRecord, AuditSink};
use crate::config::{Config, DEFAULT_CALL_TIMEOUT_SECS, DEFAULT_MAX_CONCURRENCY};
use crate::frontier::build_frontier;
use crate::llm::{GatewayError, LlmGateway};
use crate::pricing::{provider_for, PriceSource};
use crate::recommend::{RecommendationEngine, RecommendationPolicy};
use crate::scoring::{
    blend_with_history, summarize, HeuristicScorer, ModelSummary, OutputScorer, Reference,
    ScoreConfidence,
};
use crate::types::{Prompt, ReplayRequest, ReplayResult};

/// Error recorded on pairs skipped because the batch was cancelled.
pub const CANCELLED_ERROR: &str = "cancelled";

/// Execution limits of a batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrchestratorSettings {
    pub max_concurrency: usize,
    pub call_timeout: Duration,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            call_timeout: Duration::from_secs(DEFAULT_CALL_TIMEOUT_SECS),
        }
    }
}

impl From<&Config> for OrchestratorSettings {
    fn from(config: &Config) -> Self {
        Self {
            max_concurrency: config.max_concurrency,
            call_timeout: config.call_timeout,
        }
    }
}

/// Drives replay batches.
///
/// # Batch Flow
/// ```text
/// 1. Validate request (no gateway traffic on rejection)
/// 2. Create a fresh ReplayContext (price cache, permits, counters)
/// 3. For each pair: wait for a permit, call with timeout, price, score,
///    blend with audit history, audit
/// 4. summarize -> build_frontier -> recommend
/// ```
pub struct ReplayOrchestrator {
    gateway: Arc<dyn LlmGateway>,
    prices: Arc<dyn PriceSource>,
    scorer: Arc<dyn OutputScorer>,
    audit: Option<Arc<dyn AuditSink>>,
    settings: OrchestratorSettings,
    engine: RecommendationEngine,
}

impl ReplayOrchestrator {
    /// Create an orchestrator with the heuristic scorer and default limits.
    pub fn new(gateway: Arc<dyn LlmGateway>, prices: Arc<dyn PriceSource>) -> Self {
        Self {
            gateway,
            prices,
            scorer: Arc::new(HeuristicScorer::new()),
            audit: None,
            settings: OrchestratorSettings::default(),
            engine: RecommendationEngine::default(),
        }
    }

    pub fn with_scorer(mut self, scorer: Arc<dyn OutputScorer>) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn with_settings(mut self, settings: OrchestratorSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_policy(mut self, policy: RecommendationPolicy) -> Self {
        self.engine = RecommendationEngine::new(policy);
        self
    }

    /// Run a batch to completion.
    pub async fn run(&self, request: &ReplayRequest) -> Result<ReplayBundle, ReplayError> {
        self.run_with_cancel(request, CancellationToken::new()).await
    }

    /// Run a batch that stops scheduling new calls once `cancel_token` fires.
    ///
    /// Calls already in flight drain; the bundle is built from everything
    /// collected.
    pub async fn run_with_cancel(
        &self,
        request: &ReplayRequest,
        cancel_token: CancellationToken,
    ) -> Result<ReplayBundle, ReplayError> {
        validate_request(request, self.gateway.as_ref())?;

        let ctx = ReplayContext::new(
            Arc::clone(&self.gateway),
            Arc::clone(&self.prices),
            Arc::clone(&self.scorer),
            self.audit.clone(),
            request.generation.chat_options(),
            self.settings.max_concurrency,
            self.settings.call_timeout,
            cancel_token,
        );

        info!(
            "Replay {} started: {} prompts x {} models ({} calls, concurrency {})",
            ctx.request_id,
            request.prompts.len(),
            request.models.len(),
            request.total_calls(),
            self.settings.max_concurrency
        );

        let pairs = request.prompts.iter().enumerate().flat_map(|(index, prompt)| {
            request
                .models
                .iter()
                .map(move |model| (index, prompt, model.as_str()))
        });

        // join_all yields in input order, i.e. (prompt index, model position)
        let results: Vec<ReplayResult> = join_all(
            pairs.map(|(index, prompt, model)| self.replay_pair(&ctx, index, prompt, model)),
        )
        .await;

        if results.len() != request.total_calls() {
            return Err(ReplayError::Internal(format!(
                "expected {} results, collected {}",
                request.total_calls(),
                results.len()
            )));
        }

        let summary = summarize(&results, &request.models);
        let pareto_frontier = build_frontier(&summary);
        // Validation guarantees every model has a summary, so a baseline exists
        let recommendation = self
            .engine
            .recommend(&summary, &pareto_frontier, request.baseline_model.as_deref())
            .ok_or_else(|| {
                ReplayError::Internal("no baseline among replayed models".to_string())
            })?;
        let degraded = degraded_components(&ctx, &summary);

        let succeeded = results.iter().filter(|r| r.success).count();
        info!(
            "Replay {} finished: {}/{} calls succeeded, recommended {}",
            ctx.request_id,
            succeeded,
            results.len(),
            recommendation.recommended_model
        );

        Ok(ReplayBundle {
            request_id: ctx.request_id,
            generated_at: Utc::now(),
            results,
            summary,
            pareto_frontier,
            recommendation,
            degraded,
        })
    }

    /// Replay one prompt against one model.
    ///
    /// Never fails: provider errors, timeouts and cancellation are recorded
    /// on the returned result.
    pub async fn replay_pair(
        &self,
        ctx: &ReplayContext,
        prompt_index: usize,
        prompt: &Prompt,
        model: &str,
    ) -> ReplayResult {
        let provider = provider_for(model);
        let skipped = || {
            ctx.record_skipped_call();
            ReplayResult::failed(prompt_index, prompt, model, provider, CANCELLED_ERROR)
        };

        if ctx.is_cancelled() {
            return skipped();
        }

        let _permit = tokio::select! {
            biased;
            _ = ctx.cancel_token.cancelled() => return skipped(),
            permit = ctx.permits.acquire() => match permit {
                Ok(permit) => permit,
                Err(e) => {
                    return ReplayResult::failed(
                        prompt_index,
                        prompt,
                        model,
                        provider,
                        format!("semaphore error: {}", e),
                    )
                }
            },
        };

        // Cancellation may have fired while waiting for the permit
        if ctx.is_cancelled() {
            return skipped();
        }

        debug!("Replaying prompt {} on {}", prompt_index, model);

        let call = ctx.gateway.complete(model, &prompt.messages, &ctx.options);
        let completion = match tokio::time::timeout(ctx.call_timeout, call).await {
            Ok(Ok(completion)) => completion,
            Ok(Err(e)) => {
                warn!(
                    transient = e.kind.is_transient(),
                    "Prompt {} on {} failed: {}", prompt_index, model, e
                );
                return ReplayResult::failed(prompt_index, prompt, model, provider, e.to_string());
            }
            Err(_) => {
                let e = GatewayError::timeout(ctx.call_timeout.as_secs());
                warn!("Prompt {} on {} timed out", prompt_index, model);
                return ReplayResult::failed(prompt_index, prompt, model, provider, e.to_string());
            }
        };

        let usage = completion.usage;
        let quote = ctx
            .costs
            .quote(model, usage.prompt_tokens, usage.completion_tokens)
            .await;

        let output = completion.text.unwrap_or_default();
        let reference = Reference::from_prompt(prompt);
        let signal = ctx.scorer.score(&output, reference.as_ref()).await;

        let mut result = ReplayResult::failed(prompt_index, prompt, model, provider, "");
        result.success = true;
        result.error = None;
        result.prompt_tokens = usage.prompt_tokens;
        result.completion_tokens = usage.completion_tokens;
        result.total_tokens = usage.total_tokens;
        result.cost_usd = quote.cost_usd.max(0.0);
        result.cost_estimated = quote.estimated;
        result.latency_ms = completion.latency_ms.max(0.0);
        result.is_refusal = signal.is_refusal;

        if let Some(validation) = &signal.validation {
            let mut score = validation.score;
            let mut method = ctx.scorer.name().to_string();
            let mut confidence = validation.confidence;

            // Refusals stay at zero regardless of history
            if let (Some(sink), false) = (&ctx.audit, signal.is_refusal) {
                match sink.historical_score(&result.prompt_hash, model).await {
                    Ok(Some(history)) => {
                        debug!(
                            "Blending {} prior scores for {} (avg {:.1})",
                            history.count, model, history.avg_score
                        );
                        score = blend_with_history(score, history.avg_score);
                        method = format!("{}+db", method);
                        confidence = ScoreConfidence::Medium;
                    }
                    Ok(None) => {}
                    Err(e) => {
                        warn!("History lookup for {} failed: {}", model, e);
                        ctx.record_audit_failure();
                    }
                }
            }

            result.validation_score = Some(score);
            result.validation_method = Some(method.clone());
            result.validation_confidence = Some(confidence.as_str().to_string());

            if let Some(sink) = &ctx.audit {
                let record = AuditRecord {
                    input: prompt.transcript(),
                    provider: provider.to_string(),
                    model: model.to_string(),
                    output: output.clone(),
                    score,
                    method,
                    confidence: confidence.as_str().to_string(),
                    prompt_hash: result.prompt_hash.clone(),
                    recorded_at: Utc::now(),
                };
                if let Err(e) = sink.append(record).await {
                    warn!("Audit write for {} failed: {}", model, e);
                    ctx.record_audit_failure();
                }
            }
        }

        result.output = Some(output);
        result
    }
}

fn degraded_components(
    ctx: &ReplayContext,
    summary: &BTreeMap<String, ModelSummary>,
) -> Vec<DegradedComponent> {
    let mut degraded = Vec::new();

    let estimated: Vec<String> = summary
        .values()
        .filter(|s| s.pricing_estimated)
        .map(|s| s.model.clone())
        .collect();
    if !estimated.is_empty() {
        degraded.push(DegradedComponent::EstimatedPricing { models: estimated });
    }

    if ctx.audit_failures() > 0 {
        degraded.push(DegradedComponent::AuditSink {
            failed_writes: ctx.audit_failures(),
        });
    }

    if ctx.skipped_calls() > 0 {
        degraded.push(DegradedComponent::Cancelled {
            skipped_calls: ctx.skipped_calls(),
        });
    }

    degraded
}
