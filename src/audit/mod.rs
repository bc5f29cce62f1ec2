//! Append-only audit trail of scored outputs.
//!
//! Every successful replay with a validation score is offered to the
//! configured [`AuditSink`]. Sink failures never fail the batch; the
//! orchestrator counts them and reports the sink as degraded.
//!
//! Sinks that can read their own history also answer [`AuditSink::historical_score`],
//! which the orchestrator blends into fresh heuristic scores.

mod sqlite;

pub use sqlite::SqliteAuditStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One scored output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Flattened prompt transcript.
    pub input: String,
    pub provider: String,
    pub model: String,
    pub output: String,
    /// Validation score, 0-100.
    pub score: f64,
    pub method: String,
    pub confidence: String,
    pub prompt_hash: String,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("audit store unavailable: {0}")]
    Unavailable(String),
}

/// Aggregate of previously recorded scores for one prompt and model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoricalScore {
    pub avg_score: f64,
    pub count: usize,
}

/// Destination for audit records.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn append(&self, record: AuditRecord) -> Result<(), AuditError>;

    /// Average score previously recorded for this prompt on this model.
    ///
    /// Write-only sinks keep the default and report no history.
    async fn historical_score(
        &self,
        _prompt_hash: &str,
        _model: &str,
    ) -> Result<Option<HistoricalScore>, AuditError> {
        Ok(None)
    }
}
