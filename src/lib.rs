//! # replay_optimizer
//!
//! Replays historical LLM prompts against candidate models and recommends
//! the cheapest model that keeps the baseline's quality.
//!
//! ## Architecture
//! - Orchestrator: validates a batch and replays every (prompt, model) pair
//! - Pricing: per-model prices with fallback estimates, cached per batch
//! - Scoring: refusal detection, heuristic validation, consistency
//! - Frontier: Pareto-optimal (cost, quality) points
//! - Recommendation: safest cheaper substitute for the baseline model
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use replay_optimizer::llm::HttpGateway;
//! use replay_optimizer::pricing::PortkeyPricing;
//! use replay_optimizer::replay::ReplayOrchestrator;
//! use replay_optimizer::types::{Prompt, ReplayRequest};
//!
//! # async fn run() -> Result<(), replay_optimizer::replay::ReplayError> {
//! let orchestrator = ReplayOrchestrator::new(
//!     Arc::new(HttpGateway::new("http://localhost:4000/v1", None)),
//!     Arc::new(PortkeyPricing::default()),
//! );
//! let request = ReplayRequest::new(
//!     vec![Prompt::user("What is 2+2?")],
//!     vec!["gpt-4o".into(), "gpt-4o-mini".into()],
//! );
//! let bundle = orchestrator.run(&request).await?;
//! println!("{}", bundle.recommendation.reasoning);
//! # Ok(())
//! # }
//! ```

pub mod audit;
pub mod config;
pub mod frontier;
pub mod llm;
pub mod pricing;
pub mod recommend;
pub mod replay;
pub mod scoring;
pub mod types;

pub use config::Config;
pub use replay::{ReplayBundle, ReplayError, ReplayOrchestrator};
pub use types::{Prompt, ReplayRequest, ReplayResult};
