//! Batch coordinator - groups telemetry events into bounded-size batches
//!
//! The coordinator is a single task that owns a FIFO queue of pending
//! events. Producers enqueue through a cloneable handle; the coordinator
//! splits the queue into batches of at most `batch_size` events and hands
//! each batch to the configured [`Exporter`](crate::exporter::Exporter):
//!
//! - **Enqueue:** append an event, remember the newest export config
//! - **Schedule:** at most one flush is ever pending at a time
//! - **Flush:** split off one batch, export it, repeat while events remain

mod config;
mod core;
mod handle;
mod messages;

pub use config::CoordinatorConfig;
pub use core::Coordinator;
pub use handle::CoordinatorHandle;
pub use messages::{CoordRequest, CoordinatorError, CoordinatorMetrics};
