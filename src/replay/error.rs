//! Errors surfaced by a replay batch.

use thiserror::Error;

/// Why a batch could not produce a bundle.
///
/// Per-call provider failures are not errors here: they are recorded in-band
/// on the affected [`ReplayResult`](crate::types::ReplayResult).
#[derive(Debug, Error, PartialEq)]
pub enum ReplayError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("unsupported models: {}", .0.join(", "))]
    UnsupportedModels(Vec<String>),

    #[error("internal error: {0}")]
    Internal(String),
}
