//! Log exporter - reports batches through tracing

use std::fmt::Debug;

use async_trait::async_trait;
use eyre::Result;
use tracing::info;

use super::Exporter;

/// Exporter that writes each batch to the tracing log
///
/// The default sink for the `br` binary; also useful while wiring up a
/// coordinator before a real backend exists.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogExporter;

impl LogExporter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl<T, C> Exporter<T, C> for LogExporter
where
    T: Debug + Send + 'static,
    C: Debug + Send + 'static,
{
    async fn export(&self, batch: Vec<T>, config: C) -> Result<()> {
        info!(batch_len = batch.len(), ?config, "LogExporter: exporting batch");
        for event in &batch {
            info!(?event, "LogExporter: event");
        }
        Ok(())
    }
}
