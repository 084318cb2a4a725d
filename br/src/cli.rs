//! CLI argument parsing for batchrelay

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::ExporterKind;

#[derive(Parser, Debug)]
#[command(name = "br")]
#[command(author, version, about = "Telemetry batching relay", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Relay stdin lines through the batching coordinator
    ///
    /// Each line is enqueued as one event. On end of input the queue is
    /// drained and a summary is printed.
    Run {
        /// Events per exported batch
        #[arg(short = 'b', long)]
        batch_size: Option<usize>,

        /// Exporter backend
        #[arg(short, long)]
        exporter: Option<ExporterKind>,

        /// Output file for the jsonl exporter
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Export config as inline JSON, passed through to the exporter
        #[arg(long = "export-config")]
        export_config: Option<String>,
    },

    /// Summarize a batch log written by the jsonl exporter
    Stats {
        /// Batch log file to read
        #[arg(required = true)]
        file: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_run_defaults() {
        let cli = Cli::parse_from(["br", "run"]);
        if let Command::Run {
            batch_size,
            exporter,
            output,
            export_config,
        } = cli.command
        {
            assert!(batch_size.is_none());
            assert!(exporter.is_none());
            assert!(output.is_none());
            assert!(export_config.is_none());
        } else {
            panic!("Expected Run command");
        }
    }

    #[test]
    fn test_cli_parse_run_with_options() {
        let cli = Cli::parse_from(["br", "run", "-b", "8", "--exporter", "jsonl", "-o", "/tmp/batches.jsonl"]);
        if let Command::Run {
            batch_size,
            exporter,
            output,
            ..
        } = cli.command
        {
            assert_eq!(batch_size, Some(8));
            assert_eq!(exporter, Some(ExporterKind::Jsonl));
            assert_eq!(output, Some(PathBuf::from("/tmp/batches.jsonl")));
        } else {
            panic!("Expected Run command");
        }
    }

    #[test]
    fn test_cli_parse_run_export_config() {
        let cli = Cli::parse_from(["br", "run", "--export-config", r#"{"endpoint":"https://example.com"}"#]);
        if let Command::Run { export_config, .. } = cli.command {
            assert_eq!(export_config.as_deref(), Some(r#"{"endpoint":"https://example.com"}"#));
        } else {
            panic!("Expected Run command");
        }
    }

    #[test]
    fn test_cli_parse_stats() {
        let cli = Cli::parse_from(["br", "stats", "batches.jsonl"]);
        assert!(matches!(cli.command, Command::Stats { .. }));
    }

    #[test]
    fn test_cli_with_config() {
        let cli = Cli::parse_from(["br", "-c", "/path/to/config.yml", "run"]);
        assert_eq!(cli.config, Some(PathBuf::from("/path/to/config.yml")));
    }

    #[test]
    fn test_cli_log_level_is_global() {
        let cli = Cli::parse_from(["br", "run", "-l", "DEBUG"]);
        assert_eq!(cli.log_level.as_deref(), Some("DEBUG"));
    }
}
