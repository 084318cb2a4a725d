//! batchrelay - in-process telemetry batching
//!
//! batchrelay decouples event producers from a batch exporter. Producers hand
//! events to a coordinator and move on; a single background task owns the
//! queue, groups events into bounded batches, and invokes the exporter one
//! batch at a time.
//!
//! # Core Concepts
//!
//! - **Fire and Forget**: `enqueue` hands the event off without waiting for an export
//! - **Single Owner**: one task owns all queue state, no locks
//! - **One Flush in Flight**: batches export strictly one at a time
//! - **Newest Config Wins**: each batch uses the most recent export config
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use batchrelay::{Coordinator, CoordinatorConfig, Exporter, FnExporter};
//!
//! let config = CoordinatorConfig::with_batch_size(16);
//! let exporter: Arc<dyn Exporter<String, String>> =
//!     Arc::new(FnExporter::new(|batch: Vec<String>, target: String| -> eyre::Result<()> {
//!         println!("exporting {} events to {}", batch.len(), target);
//!         Ok(())
//!     }));
//!
//! let coordinator = Coordinator::new(config, exporter)?;
//! let handle = coordinator.handle();
//! tokio::spawn(coordinator.run());
//!
//! handle.enqueue("event".to_string(), "https://example.com".to_string()).await?;
//! ```
//!
//! # Modules
//!
//! - [`coordinator`] - Batching coordinator actor, handle, and config
//! - [`exporter`] - Exporter trait and built-in implementations
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod coordinator;
pub mod exporter;

// Re-export commonly used types
pub use config::{Config, ExporterConfig, ExporterKind};
pub use coordinator::{
    CoordRequest, Coordinator, CoordinatorConfig, CoordinatorError, CoordinatorHandle, CoordinatorMetrics,
};
pub use exporter::{BatchRecord, Exporter, FnExporter, JsonlExporter, LogExporter, read_batch_records};

/// Default events per exported batch
pub const DEFAULT_BATCH_SIZE: usize = 1;

/// Default request channel capacity
pub const DEFAULT_CHANNEL_BUFFER: usize = 1024;
