//! Replay execution context - per-batch state shared by every call.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::audit::AuditSink;
use crate::llm::{ChatOptions, LlmGateway};
use crate::pricing::{CostCalculator, PriceSource};
use crate::scoring::OutputScorer;

/// State for one replay batch.
///
/// Created fresh for every run and dropped with it, so the price cache and
/// degradation counters never leak between batches.
///
/// # Thread Safety
/// Shared by reference across the batch's concurrent calls; counters are
/// atomics and the price cache guards itself.
pub struct ReplayContext {
    pub request_id: Uuid,

    /// Gateway every call is routed through
    pub gateway: Arc<dyn LlmGateway>,

    /// Batch-scoped price cache
    pub costs: CostCalculator,

    /// Per-output quality scoring
    pub scorer: Arc<dyn OutputScorer>,

    /// Optional audit trail of scored outputs
    pub audit: Option<Arc<dyn AuditSink>>,

    /// Generation parameters applied to every call
    pub options: ChatOptions,

    pub call_timeout: Duration,

    /// Bounds the number of calls in flight
    pub permits: Semaphore,

    /// Cooperative cancellation of calls not yet started
    pub cancel_token: CancellationToken,

    audit_failures: AtomicUsize,
    skipped_calls: AtomicUsize,
}

impl ReplayContext {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        gateway: Arc<dyn LlmGateway>,
        prices: Arc<dyn PriceSource>,
        scorer: Arc<dyn OutputScorer>,
        audit: Option<Arc<dyn AuditSink>>,
        options: ChatOptions,
        max_concurrency: usize,
        call_timeout: Duration,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            gateway,
            costs: CostCalculator::new(prices),
            scorer,
            audit,
            options,
            call_timeout,
            permits: Semaphore::new(max_concurrency.max(1)),
            cancel_token,
            audit_failures: AtomicUsize::new(0),
            skipped_calls: AtomicUsize::new(0),
        }
    }

    /// Check if cooperative cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    pub fn record_audit_failure(&self) {
        self.audit_failures.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_skipped_call(&self) {
        self.skipped_calls.fetch_add(1, Ordering::SeqCst);
    }

    pub fn audit_failures(&self) -> usize {
        self.audit_failures.load(Ordering::SeqCst)
    }

    pub fn skipped_calls(&self) -> usize {
        self.skipped_calls.load(Ordering::SeqCst)
    }
}
