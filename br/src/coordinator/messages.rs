//! Message types for the batch coordinator

use thiserror::Error;
use tokio::sync::oneshot;

/// Requests sent to the coordinator task
#[derive(Debug)]
pub enum CoordRequest<T, C> {
    /// Append an event to the pending queue and adopt its export config
    Enqueue { event: T, config: C },

    /// Get current metrics
    GetMetrics {
        reply_tx: oneshot::Sender<CoordinatorMetrics>,
    },

    /// Drain the pending queue and stop the coordinator
    Shutdown,
}

/// Errors surfaced by the coordinator and its handle
#[derive(Debug, Clone, Error)]
pub enum CoordinatorError {
    /// A batch size of zero would make the flush cycle unable to progress
    #[error("Batch size must be at least 1, got {0}")]
    InvalidBatchSize(usize),

    /// The coordinator has shut down and no longer accepts requests
    #[error("Coordinator channel closed")]
    ChannelClosed,
}

impl CoordinatorError {
    /// Whether this error indicates a misconfiguration rather than a
    /// lifecycle condition
    pub fn is_config_error(&self) -> bool {
        matches!(self, CoordinatorError::InvalidBatchSize(_))
    }
}

/// Coordinator metrics for observability
#[derive(Debug, Clone, Default)]
pub struct CoordinatorMetrics {
    /// Events accepted through `enqueue`
    pub events_enqueued: u64,
    /// Batches successfully handed to the exporter
    pub batches_exported: u64,
    /// Events contained in successfully exported batches
    pub events_exported: u64,
    /// Batches dropped because the exporter returned an error
    pub export_failures: u64,
    /// Events currently waiting in the queue
    pub pending_events: usize,
    /// Whether a flush is currently scheduled
    pub flush_scheduled: bool,
}
