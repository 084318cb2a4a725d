//! Coordinator configuration

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::messages::CoordinatorError;

/// Configuration for a batch coordinator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Maximum number of events handed to the exporter per flush
    #[serde(default = "default_batch_size", rename = "batch-size")]
    pub batch_size: usize,

    /// Channel buffer size for coordinator requests
    #[serde(default = "default_channel_buffer", rename = "channel-buffer")]
    pub channel_buffer: usize,
}

fn default_batch_size() -> usize {
    debug!("default_batch_size: called");
    crate::DEFAULT_BATCH_SIZE
}

fn default_channel_buffer() -> usize {
    debug!("default_channel_buffer: called");
    crate::DEFAULT_CHANNEL_BUFFER
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            batch_size: crate::DEFAULT_BATCH_SIZE,
            channel_buffer: crate::DEFAULT_CHANNEL_BUFFER,
        }
    }
}

impl CoordinatorConfig {
    /// Create a configuration with the given batch size
    pub fn with_batch_size(batch_size: usize) -> Self {
        debug!(batch_size, "CoordinatorConfig::with_batch_size: called");
        Self {
            batch_size,
            ..Default::default()
        }
    }

    /// Validate the configuration
    ///
    /// A batch size of zero would split empty batches forever without
    /// draining the queue, so it is rejected here rather than at flush time.
    pub fn validate(&self) -> Result<(), CoordinatorError> {
        debug!(batch_size = self.batch_size, "CoordinatorConfig::validate: called");
        if self.batch_size == 0 {
            return Err(CoordinatorError::InvalidBatchSize(self.batch_size));
        }
        Ok(())
    }
}
