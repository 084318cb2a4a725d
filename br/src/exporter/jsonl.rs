//! JSONL exporter - appends one JSON record per batch to a file

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use eyre::Result;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::Exporter;

/// One exported batch as written to the log file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRecord<T, C> {
    /// Timestamp of the export
    #[serde(rename = "ts")]
    pub timestamp: DateTime<Utc>,
    /// Number of events in the batch
    #[serde(rename = "batch-len")]
    pub batch_len: usize,
    /// The exported events, in enqueue order
    pub events: Vec<T>,
    /// The export config the batch was flushed with
    pub config: C,
}

impl<T, C> BatchRecord<T, C> {
    /// Create a record with the current timestamp
    pub fn new(events: Vec<T>, config: C) -> Self {
        Self {
            timestamp: Utc::now(),
            batch_len: events.len(),
            events,
            config,
        }
    }
}

/// Exporter that appends each batch as a JSON line
///
/// Records are flushed to disk per batch, so a crash loses at most the
/// batch currently being written.
pub struct JsonlExporter {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl JsonlExporter {
    /// Open the file at `path` for appending, creating it if needed
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        debug!(?path, "JsonlExporter::create: opening output file");

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    /// Path of the output file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl<T, C> Exporter<T, C> for JsonlExporter
where
    T: Serialize + Send + 'static,
    C: Serialize + Send + 'static,
{
    async fn export(&self, batch: Vec<T>, config: C) -> Result<()> {
        let record = BatchRecord::new(batch, config);
        let json = serde_json::to_string(&record)?;

        let mut writer = self.writer.lock().await;
        writeln!(writer, "{}", json)?;
        writer.flush()?;

        debug!(batch_len = record.batch_len, path = ?self.path, "JsonlExporter: batch written");
        Ok(())
    }
}

/// Read batch records back from a JSONL file
///
/// Unparseable lines are skipped with a warning; a missing file yields an
/// empty list.
pub fn read_batch_records<T, C>(path: impl AsRef<Path>) -> Result<Vec<BatchRecord<T, C>>>
where
    T: DeserializeOwned,
    C: DeserializeOwned,
{
    let path = path.as_ref();
    debug!(?path, "read_batch_records: reading log file");

    if !path.exists() {
        return Ok(Vec::new());
    }

    let content = std::fs::read_to_string(path)?;
    let mut records = Vec::new();

    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<BatchRecord<T, C>>(line) {
            Ok(record) => records.push(record),
            Err(e) => {
                warn!(line, error = %e, "read_batch_records: failed to parse line");
            }
        }
    }

    debug!(count = records.len(), "read_batch_records: loaded records");
    Ok(records)
}
