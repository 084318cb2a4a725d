//! batchrelay - telemetry batching relay
//!
//! CLI entry point for relaying line-delimited events through the
//! batching coordinator.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use eyre::{Context, Result};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use batchrelay::cli::{Cli, Command};
use batchrelay::config::{Config, ExporterKind};
use batchrelay::coordinator::Coordinator;
use batchrelay::exporter::{BatchRecord, Exporter, JsonlExporter, LogExporter, read_batch_records};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level_str = cli_log_level.or(config_log_level);
    let level = if let Some(s) = level_str {
        match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        }
    } else {
        tracing::Level::INFO
    };

    // Logs go to stderr so stdout stays usable in a pipeline
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());

    // Setup logging with priority: CLI > config > INFO default
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    // Dispatch command
    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Run {
            batch_size,
            exporter,
            output,
            export_config,
        } => {
            debug!(?batch_size, ?exporter, ?output, "main: matched Run command");
            cmd_run(config, batch_size, exporter, output, export_config).await
        }
        Command::Stats { file } => {
            debug!(?file, "main: matched Stats command");
            cmd_stats(&file).await
        }
    }
}

/// Relay stdin lines through the coordinator until end of input
async fn cmd_run(
    mut config: Config,
    batch_size: Option<usize>,
    exporter_kind: Option<ExporterKind>,
    output: Option<PathBuf>,
    export_config: Option<String>,
) -> Result<()> {
    debug!("cmd_run: called");

    // CLI overrides take precedence over the config file
    if let Some(size) = batch_size {
        debug!(size, "cmd_run: overriding batch size");
        config.coordinator.batch_size = size;
    }
    if let Some(kind) = exporter_kind {
        debug!(?kind, "cmd_run: overriding exporter kind");
        config.exporter.kind = kind;
    }
    if let Some(path) = output {
        debug!(?path, "cmd_run: overriding output path");
        config.exporter.output_path = path;
    }
    config.validate().context("Invalid configuration")?;

    // Inline JSON beats the config file's export-config
    let export_config = match export_config {
        Some(raw) => serde_json::from_str(&raw).context("Failed to parse --export-config as JSON")?,
        None => config.export_config.clone(),
    };

    let exporter: Arc<dyn Exporter<Value, Value>> = match config.exporter.kind {
        ExporterKind::Log => {
            debug!("cmd_run: using log exporter");
            Arc::new(LogExporter::new())
        }
        ExporterKind::Jsonl => {
            debug!(path = ?config.exporter.output_path, "cmd_run: using jsonl exporter");
            Arc::new(JsonlExporter::create(&config.exporter.output_path).context("Failed to open output file")?)
        }
    };

    let coordinator = Coordinator::new(config.coordinator.clone(), exporter)?;
    let handle = coordinator.handle();
    let coord_task = tokio::spawn(coordinator.run());
    info!("Relay started, reading stdin");

    // One event per non-empty stdin line; JSON lines keep their structure
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let event = match serde_json::from_str::<Value>(&line) {
            Ok(value) => value,
            Err(_) => Value::String(line),
        };
        handle.enqueue(event, export_config.clone()).await?;
    }
    debug!("cmd_run: stdin closed, draining");

    handle.shutdown().await?;
    let metrics = coord_task.await?;

    println!("Relay Summary");
    println!("-------------");
    println!("Events enqueued:  {}", metrics.events_enqueued);
    println!("Events exported:  {}", metrics.events_exported);
    println!("Batches exported: {}", metrics.batches_exported);
    println!("Export failures:  {}", metrics.export_failures);

    if metrics.export_failures > 0 {
        // stdout is block-buffered when piped; flush the summary before
        // the nonzero exit skips the normal cleanup.
        std::io::Write::flush(&mut std::io::stdout()).ok();
        std::process::exit(1);
    }

    Ok(())
}

/// Summarize a batch log written by the jsonl exporter
async fn cmd_stats(file: &Path) -> Result<()> {
    debug!(?file, "cmd_stats: called");
    let records: Vec<BatchRecord<Value, Value>> = read_batch_records(file)?;

    if records.is_empty() {
        println!("No batches found in {}", file.display());
        return Ok(());
    }

    let total_events: usize = records.iter().map(|r| r.events.len()).sum();
    let largest = records.iter().map(|r| r.events.len()).max().unwrap_or(0);

    println!("Batch Log Stats");
    println!("---------------");
    println!("File:          {}", file.display());
    println!("Batches:       {}", records.len());
    println!("Total events:  {}", total_events);
    println!("Largest batch: {}", largest);
    if let (Some(first), Some(last)) = (records.first(), records.last()) {
        println!("First export:  {}", first.timestamp);
        println!("Last export:   {}", last.timestamp);
    }

    Ok(())
}
