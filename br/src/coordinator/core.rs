//! Batch coordinator task implementation

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::exporter::Exporter;

use super::config::CoordinatorConfig;
use super::handle::CoordinatorHandle;
use super::messages::{CoordRequest, CoordinatorError, CoordinatorMetrics};

/// Queue, flag, and config owned exclusively by the coordinator task
struct CoordinatorState<T, C> {
    /// Pending events in enqueue order
    pending: VecDeque<T>,
    /// Export config from the most recent enqueue (last write wins)
    export_config: Option<C>,
    /// True iff a flush has been requested but not yet executed
    flush_scheduled: bool,
    metrics: CoordinatorMetrics,
}

impl<T, C> CoordinatorState<T, C> {
    fn new() -> Self {
        Self {
            pending: VecDeque::new(),
            export_config: None,
            flush_scheduled: false,
            metrics: CoordinatorMetrics::default(),
        }
    }

    /// Append an event and adopt its export config
    fn enqueue(&mut self, event: T, config: C) {
        self.pending.push_back(event);
        self.export_config = Some(config);
        self.metrics.events_enqueued += 1;
        debug!(pending = self.pending.len(), "CoordinatorState::enqueue: event appended");
    }

    /// Scheduling rule, evaluated after every queue mutation and after every
    /// flush completion
    ///
    /// Returns true when this call scheduled a new flush.
    fn schedule_flush(&mut self) -> bool {
        if self.flush_scheduled {
            debug!("CoordinatorState::schedule_flush: flush already scheduled");
            return false;
        }
        if self.pending.is_empty() {
            debug!("CoordinatorState::schedule_flush: queue empty, nothing to flush");
            return false;
        }
        self.flush_scheduled = true;
        debug!(pending = self.pending.len(), "CoordinatorState::schedule_flush: flush scheduled");
        true
    }

    /// Split off the next batch, preserving order in both the batch and the
    /// remaining queue
    fn split_batch(&mut self, batch_size: usize) -> Vec<T> {
        let take = batch_size.min(self.pending.len());
        self.pending.drain(..take).collect()
    }

    /// Metrics snapshot with the queue gauges filled in
    fn metrics_snapshot(&self) -> CoordinatorMetrics {
        let mut metrics = self.metrics.clone();
        metrics.pending_events = self.pending.len();
        metrics.flush_scheduled = self.flush_scheduled;
        metrics
    }

    /// Apply one request to the state
    ///
    /// Returns false when the request asks for shutdown.
    fn apply(&mut self, req: CoordRequest<T, C>) -> bool {
        match req {
            CoordRequest::Enqueue { event, config } => {
                self.enqueue(event, config);
                self.schedule_flush();
                true
            }

            CoordRequest::GetMetrics { reply_tx } => {
                debug!("CoordinatorState::apply: metrics requested");
                let _ = reply_tx.send(self.metrics_snapshot());
                true
            }

            CoordRequest::Shutdown => {
                debug!("CoordinatorState::apply: shutdown requested");
                false
            }
        }
    }

    /// Execute one flush cycle: split off a batch, invoke the exporter,
    /// and apply the state update
    ///
    /// A failing export drops its batch, increments `export_failures`, and
    /// leaves the remaining queue intact for the next cycle.
    async fn flush(&mut self, batch_size: usize, exporter: &dyn Exporter<T, C>)
    where
        C: Clone,
    {
        self.flush_scheduled = false;

        if self.pending.is_empty() {
            debug!("CoordinatorState::flush: queue empty, nothing to export");
            return;
        }

        let batch = self.split_batch(batch_size);
        let batch_len = batch.len();

        // Set by the same request that enqueued the events, so a non-empty
        // queue always carries a config.
        let Some(config) = self.export_config.clone() else {
            error!(batch_len, "CoordinatorState::flush: no export config recorded, dropping batch");
            self.metrics.export_failures += 1;
            return;
        };

        debug!(
            batch_len,
            remaining = self.pending.len(),
            "CoordinatorState::flush: exporting batch"
        );

        match exporter.export(batch, config).await {
            Ok(()) => {
                self.metrics.batches_exported += 1;
                self.metrics.events_exported += batch_len as u64;
            }
            Err(e) => {
                error!(batch_len, error = %e, "CoordinatorState::flush: export failed, dropping batch");
                self.metrics.export_failures += 1;
            }
        }
    }

    /// Best-effort final drain on shutdown: flush until the queue is empty
    async fn drain(&mut self, batch_size: usize, exporter: &dyn Exporter<T, C>)
    where
        C: Clone,
    {
        info!(pending = self.pending.len(), "Coordinator shutting down");
        while !self.pending.is_empty() {
            self.flush(batch_size, exporter).await;
        }
    }
}

/// The coordinator owns the pending-event queue and drives flush cycles
///
/// Events and export configs are opaque to the coordinator: events are
/// stored, ordered, and forwarded; the config rides along and the most
/// recent value is handed to the exporter with each batch.
pub struct Coordinator<T, C> {
    config: CoordinatorConfig,
    tx: mpsc::Sender<CoordRequest<T, C>>,
    rx: mpsc::Receiver<CoordRequest<T, C>>,
    exporter: Arc<dyn Exporter<T, C>>,
}

impl<T, C> Coordinator<T, C>
where
    T: Send + 'static,
    C: Clone + Send + 'static,
{
    /// Create a new coordinator with the given configuration and exporter
    ///
    /// Rejects configurations with a batch size of zero.
    pub fn new(config: CoordinatorConfig, exporter: Arc<dyn Exporter<T, C>>) -> Result<Self, CoordinatorError> {
        config.validate()?;
        let (tx, rx) = mpsc::channel(config.channel_buffer);
        debug!(
            batch_size = config.batch_size,
            channel_buffer = config.channel_buffer,
            "Coordinator::new: created"
        );
        Ok(Self {
            config,
            tx,
            rx,
            exporter,
        })
    }

    /// Get a handle for enqueuing events
    ///
    /// Handles can be created before `run` is spawned and cloned freely.
    pub fn handle(&self) -> CoordinatorHandle<T, C> {
        CoordinatorHandle::new(self.tx.clone())
    }

    /// Run the coordinator task
    ///
    /// Consumes the coordinator and runs until shutdown is requested or
    /// every handle has been dropped, then returns the final metrics. A
    /// scheduled flush always runs before the task exits, so closing the
    /// inbox never abandons queued events.
    pub async fn run(self) -> CoordinatorMetrics {
        let Self { config, tx, mut rx, exporter } = self;

        // Only external handles may hold the inbox open; dropping our own
        // sender lets `recv` observe the close once every handle is gone.
        drop(tx);

        let mut state = CoordinatorState::new();

        info!(batch_size = config.batch_size, "Coordinator started");

        loop {
            // A scheduled flush runs once every request already sitting in
            // the inbox has been applied, so a burst of enqueues coalesces
            // into the same batch split.
            let req = if state.flush_scheduled {
                match rx.try_recv() {
                    Ok(req) => Some(req),
                    Err(_) => {
                        state.flush(config.batch_size, exporter.as_ref()).await;
                        state.schedule_flush();
                        continue;
                    }
                }
            } else {
                rx.recv().await
            };

            let Some(req) = req else {
                debug!("Coordinator: inbox closed, stopping");
                break;
            };

            if !state.apply(req) {
                state.drain(config.batch_size, exporter.as_ref()).await;
                break;
            }
        }

        let metrics = state.metrics_snapshot();
        info!(
            batches_exported = metrics.batches_exported,
            events_exported = metrics.events_exported,
            "Coordinator stopped"
        );
        metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use eyre::{Result, eyre};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::{Notify, Semaphore};

    /// Records every exported batch together with its config
    struct RecordingExporter {
        calls: Arc<Mutex<Vec<(Vec<String>, String)>>>,
    }

    impl RecordingExporter {
        fn new() -> Self {
            Self {
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn calls(&self) -> Arc<Mutex<Vec<(Vec<String>, String)>>> {
            self.calls.clone()
        }
    }

    #[async_trait]
    impl Exporter<String, String> for RecordingExporter {
        async fn export(&self, batch: Vec<String>, config: String) -> Result<()> {
            self.calls.lock().unwrap().push((batch, config));
            Ok(())
        }
    }

    /// Blocks inside export until the test releases a permit
    struct GateExporter {
        calls: Arc<Mutex<Vec<Vec<String>>>>,
        started: Arc<Notify>,
        gate: Arc<Semaphore>,
    }

    #[async_trait]
    impl Exporter<String, String> for GateExporter {
        async fn export(&self, batch: Vec<String>, _config: String) -> Result<()> {
            self.calls.lock().unwrap().push(batch);
            self.started.notify_one();
            self.gate.acquire().await.unwrap().forget();
            Ok(())
        }
    }

    /// Fails any batch containing the event "bad"
    struct FlakyExporter {
        calls: Arc<Mutex<Vec<Vec<String>>>>,
    }

    #[async_trait]
    impl Exporter<String, String> for FlakyExporter {
        async fn export(&self, batch: Vec<String>, _config: String) -> Result<()> {
            if batch.iter().any(|e| e == "bad") {
                return Err(eyre!("simulated export failure"));
            }
            self.calls.lock().unwrap().push(batch);
            Ok(())
        }
    }

    fn events(calls: &Arc<Mutex<Vec<(Vec<String>, String)>>>) -> Vec<Vec<String>> {
        calls.lock().unwrap().iter().map(|(batch, _)| batch.clone()).collect()
    }

    #[tokio::test]
    async fn test_single_event_batches() {
        let exporter = Arc::new(RecordingExporter::new());
        let calls = exporter.calls();

        let coord = Coordinator::new(CoordinatorConfig::default(), exporter).unwrap();
        let handle = coord.handle();
        let coord_task = tokio::spawn(coord.run());

        handle.enqueue("a".to_string(), "cfg".to_string()).await.unwrap();
        handle.enqueue("b".to_string(), "cfg".to_string()).await.unwrap();
        handle.enqueue("c".to_string(), "cfg".to_string()).await.unwrap();

        handle.shutdown().await.unwrap();
        let metrics = coord_task.await.unwrap();

        // Batch size 1: every event reported individually, in order
        assert_eq!(events(&calls), vec![vec!["a"], vec!["b"], vec!["c"]]);
        assert_eq!(metrics.events_enqueued, 3);
        assert_eq!(metrics.batches_exported, 3);
        assert_eq!(metrics.events_exported, 3);
        assert_eq!(metrics.pending_events, 0);
    }

    #[tokio::test]
    async fn test_burst_splits_into_batches() {
        let exporter = Arc::new(RecordingExporter::new());
        let calls = exporter.calls();

        let coord = Coordinator::new(CoordinatorConfig::with_batch_size(2), exporter).unwrap();
        let handle = coord.handle();

        // Buffer the burst before the coordinator starts so all three
        // events are visible to the first split.
        handle.enqueue("a".to_string(), "cfg".to_string()).await.unwrap();
        handle.enqueue("b".to_string(), "cfg".to_string()).await.unwrap();
        handle.enqueue("c".to_string(), "cfg".to_string()).await.unwrap();
        handle.shutdown().await.unwrap();

        let metrics = coord.run().await;

        assert_eq!(events(&calls), vec![vec!["a", "b"], vec!["c"]]);
        assert_eq!(metrics.batches_exported, 2);
        assert_eq!(metrics.events_exported, 3);
    }

    #[tokio::test]
    async fn test_partial_batch_flushes_immediately() {
        let exporter = Arc::new(RecordingExporter::new());
        let calls = exporter.calls();

        let coord = Coordinator::new(CoordinatorConfig::with_batch_size(5), exporter).unwrap();
        let handle = coord.handle();

        // Buffer both events first so they land in a single undersized
        // batch instead of racing the first flush.
        handle.enqueue("a".to_string(), "cfg".to_string()).await.unwrap();
        handle.enqueue("b".to_string(), "cfg".to_string()).await.unwrap();

        let coord_task = tokio::spawn(coord.run());

        // The partial batch must go out without any shutdown or further
        // enqueue nudging it along.
        let metrics = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let metrics = handle.metrics().await.unwrap();
                if metrics.batches_exported == 1 {
                    break metrics;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        assert_eq!(events(&calls), vec![vec!["a", "b"]]);
        assert_eq!(metrics.pending_events, 0);
        assert!(!metrics.flush_scheduled);

        handle.shutdown().await.unwrap();
        coord_task.await.unwrap();
    }

    #[tokio::test]
    async fn test_events_during_export_go_to_next_flush() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let started = Arc::new(Notify::new());
        let gate = Arc::new(Semaphore::new(0));
        let exporter = Arc::new(GateExporter {
            calls: calls.clone(),
            started: started.clone(),
            gate: gate.clone(),
        });

        let coord = Coordinator::new(CoordinatorConfig::with_batch_size(4), exporter).unwrap();
        let handle = coord.handle();
        let coord_task = tokio::spawn(coord.run());

        handle.enqueue("a".to_string(), "cfg".to_string()).await.unwrap();
        started.notified().await;

        // The first export is now blocked inside the exporter; these land
        // in the inbox and must not join the in-flight batch.
        handle.enqueue("x".to_string(), "cfg".to_string()).await.unwrap();
        handle.enqueue("y".to_string(), "cfg".to_string()).await.unwrap();
        handle.enqueue("z".to_string(), "cfg".to_string()).await.unwrap();

        gate.add_permits(2);
        handle.shutdown().await.unwrap();
        let metrics = coord_task.await.unwrap();

        let recorded = calls.lock().unwrap().clone();
        assert_eq!(recorded, vec![vec!["a"], vec!["x", "y", "z"]]);
        assert_eq!(metrics.batches_exported, 2);
        assert_eq!(metrics.events_exported, 4);
    }

    #[tokio::test]
    async fn test_config_last_write_wins() {
        let exporter = Arc::new(RecordingExporter::new());
        let calls = exporter.calls();

        let coord = Coordinator::new(CoordinatorConfig::with_batch_size(2), exporter).unwrap();
        let handle = coord.handle();

        // Both events coalesce into one batch; the later config wins even
        // for the earlier event.
        handle.enqueue("a".to_string(), "cfg-1".to_string()).await.unwrap();
        handle.enqueue("b".to_string(), "cfg-2".to_string()).await.unwrap();
        handle.enqueue("c".to_string(), "cfg-3".to_string()).await.unwrap();
        handle.shutdown().await.unwrap();

        coord.run().await;

        let recorded = calls.lock().unwrap().clone();
        assert_eq!(
            recorded,
            vec![
                (vec!["a".to_string(), "b".to_string()], "cfg-3".to_string()),
                (vec!["c".to_string()], "cfg-3".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_idle_quiescence() {
        let exporter = Arc::new(RecordingExporter::new());
        let calls = exporter.calls();

        let coord = Coordinator::<String, String>::new(CoordinatorConfig::default(), exporter).unwrap();
        let handle = coord.handle();
        let coord_task = tokio::spawn(coord.run());

        tokio::time::sleep(Duration::from_millis(50)).await;

        let metrics = handle.metrics().await.unwrap();
        assert_eq!(metrics.events_enqueued, 0);
        assert_eq!(metrics.batches_exported, 0);
        assert_eq!(metrics.pending_events, 0);
        assert!(!metrics.flush_scheduled);

        handle.shutdown().await.unwrap();
        let metrics = coord_task.await.unwrap();
        assert_eq!(metrics.batches_exported, 0);
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_export_failure_drops_batch_and_continues() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let exporter = Arc::new(FlakyExporter { calls: calls.clone() });

        let coord = Coordinator::new(CoordinatorConfig::default(), exporter).unwrap();
        let handle = coord.handle();

        handle.enqueue("good-1".to_string(), "cfg".to_string()).await.unwrap();
        handle.enqueue("bad".to_string(), "cfg".to_string()).await.unwrap();
        handle.enqueue("good-2".to_string(), "cfg".to_string()).await.unwrap();
        handle.shutdown().await.unwrap();

        let metrics = coord.run().await;

        let recorded = calls.lock().unwrap().clone();
        assert_eq!(recorded, vec![vec!["good-1"], vec!["good-2"]]);
        assert_eq!(metrics.export_failures, 1);
        assert_eq!(metrics.batches_exported, 2);
        assert_eq!(metrics.events_exported, 2);
        assert_eq!(metrics.pending_events, 0);
    }

    #[tokio::test]
    async fn test_rejects_zero_batch_size() {
        let exporter: Arc<dyn Exporter<String, String>> = Arc::new(RecordingExporter::new());
        let result = Coordinator::new(CoordinatorConfig::with_batch_size(0), exporter);
        assert!(matches!(result, Err(CoordinatorError::InvalidBatchSize(0))));
    }

    #[tokio::test]
    async fn test_shutdown_drains_queue() {
        let exporter = Arc::new(RecordingExporter::new());
        let calls = exporter.calls();

        let coord = Coordinator::new(CoordinatorConfig::with_batch_size(3), exporter).unwrap();
        let handle = coord.handle();

        for i in 0..7 {
            handle.enqueue(format!("e{i}"), "cfg".to_string()).await.unwrap();
        }
        handle.shutdown().await.unwrap();

        let metrics = coord.run().await;

        let lens: Vec<usize> = events(&calls).iter().map(|b| b.len()).collect();
        assert_eq!(lens, vec![3, 3, 1]);
        assert_eq!(metrics.events_exported, 7);
        assert_eq!(metrics.pending_events, 0);
    }

    #[tokio::test]
    async fn test_inbox_close_completes_scheduled_flushes() {
        let exporter = Arc::new(RecordingExporter::new());
        let calls = exporter.calls();

        let coord = Coordinator::new(CoordinatorConfig::with_batch_size(2), exporter).unwrap();
        let handle = coord.handle();

        for i in 0..5 {
            handle.enqueue(format!("e{i}"), "cfg".to_string()).await.unwrap();
        }
        drop(handle);

        // No explicit shutdown: the closed inbox still lets scheduled
        // flushes run to completion.
        let metrics = coord.run().await;

        let lens: Vec<usize> = events(&calls).iter().map(|b| b.len()).collect();
        assert_eq!(lens, vec![2, 2, 1]);
        assert_eq!(metrics.events_exported, 5);
        assert_eq!(metrics.pending_events, 0);
    }
}
