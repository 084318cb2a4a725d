//! Batchrelay configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::coordinator::CoordinatorConfig;

/// Main batchrelay configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,

    /// Coordinator configuration
    pub coordinator: CoordinatorConfig,

    /// Exporter configuration
    pub exporter: ExporterConfig,

    /// Opaque export configuration handed to the exporter with every batch
    #[serde(rename = "export-config")]
    pub export_config: serde_json::Value,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Call this early in startup to fail fast with clear error messages.
    pub fn validate(&self) -> Result<()> {
        self.coordinator.validate()?;
        Ok(())
    }

    /// Best-effort peek at the configured log level
    ///
    /// Used before logging is initialized, so failures stay silent and
    /// fall back to None.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let path = config_path.cloned().or_else(|| {
            let local = PathBuf::from(".batchrelay.yml");
            if local.exists() {
                return Some(local);
            }
            dirs::config_dir()
                .map(|d| d.join("batchrelay").join("batchrelay.yml"))
                .filter(|p| p.exists())
        })?;

        let content = fs::read_to_string(path).ok()?;
        let config: Config = serde_yaml::from_str(&content).ok()?;
        config.log_level
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .batchrelay.yml
        let local_config = PathBuf::from(".batchrelay.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/batchrelay/batchrelay.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("batchrelay").join("batchrelay.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Exporter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExporterConfig {
    /// Exporter backend to use
    pub kind: ExporterKind,

    /// Output file for the jsonl exporter
    #[serde(rename = "output-path")]
    pub output_path: PathBuf,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            kind: ExporterKind::Log,
            output_path: PathBuf::from("batches.jsonl"),
        }
    }
}

/// Exporter backends selectable from config or the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExporterKind {
    /// Log each batch through tracing
    Log,
    /// Append each batch as a JSON line to a file
    Jsonl,
}
