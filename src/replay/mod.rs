//! Replay module - runs a batch of prompts against candidate models and
//! turns the results into a recommendation.
//!
//! # Pipeline
//! ```text
//! validate -> replay every (prompt, model) pair -> summarize
//!          -> build Pareto frontier -> recommend
//! ```

mod context;
mod error;
mod orchestrator;
mod request;

pub use context::ReplayContext;
pub use error::ReplayError;
pub use orchestrator::{OrchestratorSettings, ReplayOrchestrator, CANCELLED_ERROR};
pub use request::validate_request;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::frontier::ParetoPoint;
use crate::recommend::Recommendation;
use crate::scoring::ModelSummary;
use crate::types::ReplayResult;

/// A component that did not run at full fidelity during a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "component", rename_all = "snake_case")]
pub enum DegradedComponent {
    /// Costs for these models came from fallback price tiers.
    EstimatedPricing { models: Vec<String> },
    /// Audit writes or history lookups that failed.
    AuditSink { failed_writes: usize },
    /// The batch was cancelled; these calls never ran.
    Cancelled { skipped_calls: usize },
}

/// Everything produced by one replay batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayBundle {
    pub request_id: Uuid,
    pub generated_at: DateTime<Utc>,
    /// One per (prompt, model), ordered by prompt index then model position.
    pub results: Vec<ReplayResult>,
    pub summary: BTreeMap<String, ModelSummary>,
    pub pareto_frontier: Vec<ParetoPoint>,
    pub recommendation: Recommendation,
    #[serde(default)]
    pub degraded: Vec<DegradedComponent>,
}

impl ReplayBundle {
    pub fn is_degraded(&self) -> bool {
        !self.degraded.is_empty()
    }
}
