//! CoordinatorHandle - producer-side interface for enqueuing events

use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use super::messages::{CoordRequest, CoordinatorError, CoordinatorMetrics};

/// Handle for producers to feed a running coordinator
///
/// The handle is cheap to clone and every clone feeds the same coordinator.
/// Operations only fail once the coordinator has stopped. Dropping every
/// handle closes the coordinator's inbox: the coordinator completes any
/// scheduled flushes and then stops.
pub struct CoordinatorHandle<T, C> {
    /// Sender to the coordinator task
    tx: mpsc::Sender<CoordRequest<T, C>>,
}

impl<T, C> Clone for CoordinatorHandle<T, C> {
    fn clone(&self) -> Self {
        Self { tx: self.tx.clone() }
    }
}

impl<T, C> CoordinatorHandle<T, C> {
    pub(crate) fn new(tx: mpsc::Sender<CoordRequest<T, C>>) -> Self {
        debug!("CoordinatorHandle::new: called");
        Self { tx }
    }

    /// Enqueue an event together with the export config for its flush
    ///
    /// Fire-and-forget: the call resolves once the coordinator's inbox has
    /// accepted the request, never waiting on exporter latency. The config
    /// overwrites any previously supplied value (last write wins).
    pub async fn enqueue(&self, event: T, config: C) -> Result<(), CoordinatorError> {
        debug!("CoordinatorHandle::enqueue: called");
        self.tx
            .send(CoordRequest::Enqueue { event, config })
            .await
            .map_err(|_| CoordinatorError::ChannelClosed)?;

        debug!("CoordinatorHandle::enqueue: sent");
        Ok(())
    }

    /// Get current coordinator metrics
    pub async fn metrics(&self) -> Result<CoordinatorMetrics, CoordinatorError> {
        debug!("CoordinatorHandle::metrics: called");
        let (reply_tx, reply_rx) = oneshot::channel();

        self.tx
            .send(CoordRequest::GetMetrics { reply_tx })
            .await
            .map_err(|_| CoordinatorError::ChannelClosed)?;

        debug!("CoordinatorHandle::metrics: waiting for reply");
        reply_rx.await.map_err(|_| CoordinatorError::ChannelClosed)
    }

    /// Request shutdown
    ///
    /// The coordinator drains the pending queue (one batch per cycle, still
    /// honoring the batch size bound) before it stops. Events enqueued after
    /// this call may be rejected with [`CoordinatorError::ChannelClosed`].
    pub async fn shutdown(&self) -> Result<(), CoordinatorError> {
        debug!("CoordinatorHandle::shutdown: called");
        self.tx
            .send(CoordRequest::Shutdown)
            .await
            .map_err(|_| CoordinatorError::ChannelClosed)?;

        debug!("CoordinatorHandle::shutdown: sent");
        Ok(())
    }

    /// Whether the coordinator has stopped accepting requests
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
