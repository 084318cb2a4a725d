//! Exporter trait and provided sinks
//!
//! The exporter is the coordinator's one outbound collaborator: it receives
//! each completed batch along with the most recent export config. Provided
//! implementations cover the common cases; anything that talks to a real
//! backend implements [`Exporter`] itself.

mod jsonl;
mod log;

pub use jsonl::{BatchRecord, JsonlExporter, read_batch_records};
pub use log::LogExporter;

use async_trait::async_trait;
use eyre::Result;

/// Receives completed batches from the coordinator
///
/// Invoked once per flush cycle, always with a non-empty batch. The batch is
/// an owned snapshot and the config a clone of the most recent value, so
/// implementations may retain or mutate both freely. Returning an error
/// drops the batch; the coordinator logs it, counts it, and keeps draining.
#[async_trait]
pub trait Exporter<T, C>: Send + Sync {
    async fn export(&self, batch: Vec<T>, config: C) -> Result<()>;
}

/// Adapts a plain function to the [`Exporter`] trait
///
/// Handy for tests and for callers whose export path is a simple closure
/// rather than a named type.
pub struct FnExporter<F> {
    f: F,
}

impl<F> FnExporter<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<T, C, F> Exporter<T, C> for FnExporter<F>
where
    T: Send + 'static,
    C: Send + 'static,
    F: Fn(Vec<T>, C) -> Result<()> + Send + Sync,
{
    async fn export(&self, batch: Vec<T>, config: C) -> Result<()> {
        (self.f)(batch, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn test_fn_exporter_invokes_closure() {
        let seen: Arc<Mutex<Vec<(Vec<u32>, &'static str)>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();

        let exporter = FnExporter::new(move |batch: Vec<u32>, config: &'static str| -> Result<()> {
            sink.lock().unwrap().push((batch, config));
            Ok(())
        });

        exporter.export(vec![1, 2, 3], "cfg").await.unwrap();

        let calls = seen.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], (vec![1, 2, 3], "cfg"));
    }

    #[tokio::test]
    async fn test_fn_exporter_propagates_errors() {
        let exporter = FnExporter::new(|_batch: Vec<u32>, _config: ()| -> Result<()> {
            Err(eyre::eyre!("backend unavailable"))
        });

        let result = exporter.export(vec![1], ()).await;
        assert!(result.is_err());
    }
}
