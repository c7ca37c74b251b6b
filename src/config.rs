//! Configuration management for Widget Relay
//!
//! Handles loading and validating the YAML configuration file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::fs;

use crate::dispatch::DEFAULT_THROTTLE_MS;

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RelayConfig {
    /// Minimum interval between two outbound sends
    #[serde(default = "default_throttle_ms")]
    pub throttle_ms: u64,
    #[serde(default)]
    pub output: OutputConfig,
    /// Overrides the command-line log level when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

/// How the demo transport prints envelopes
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
}

/// Envelope rendering
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One JSON object per line
    #[default]
    Json,
    /// Indented JSON
    Pretty,
}

fn default_throttle_ms() -> u64 {
    DEFAULT_THROTTLE_MS
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            throttle_ms: default_throttle_ms(),
            output: OutputConfig::default(),
            log_level: None,
        }
    }
}

impl RelayConfig {
    /// Load configuration from a YAML file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: RelayConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to defaults
    ///
    /// An error while checking for the file (other than it being absent) is
    /// returned, not treated as a missing file.
    pub async fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let exists = fs::try_exists(path)
            .await
            .with_context(|| format!("Failed to check config file: {}", path.display()))?;
        if exists {
            Self::load(path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Validate configuration for correctness
    pub fn validate(&self) -> Result<()> {
        if self.throttle_ms == 0 {
            anyhow::bail!("throttle_ms must be greater than 0");
        }
        if let Some(level) = &self.log_level {
            if level.trim().is_empty() {
                anyhow::bail!("log_level cannot be empty");
            }
        }
        Ok(())
    }

    pub fn throttle_window(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_load_full_config() {
        let file = write_config(
            "throttle_ms: 250\noutput:\n  format: pretty\nlog_level: debug\n",
        );

        let config = RelayConfig::load(file.path()).await.unwrap();
        assert_eq!(config.throttle_ms, 250);
        assert_eq!(config.output.format, OutputFormat::Pretty);
        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert_eq!(config.throttle_window(), Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_load_applies_defaults() {
        let file = write_config("{}\n");

        let config = RelayConfig::load(file.path()).await.unwrap();
        assert_eq!(config, RelayConfig::default());
        assert_eq!(config.throttle_ms, 400);
    }

    #[tokio::test]
    async fn test_zero_throttle_rejected() {
        let file = write_config("throttle_ms: 0\n");
        assert!(RelayConfig::load(file.path()).await.is_err());
    }

    #[tokio::test]
    async fn test_invalid_yaml_rejected() {
        let file = write_config("throttle_ms: [nope\n");
        let err = RelayConfig::load(file.path()).await.unwrap_err();
        assert!(err.to_string().contains("Failed to parse YAML config"));
    }

    #[tokio::test]
    async fn test_missing_file_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = RelayConfig::load_or_default(dir.path().join("absent.yaml"))
            .await
            .unwrap();
        assert_eq!(config, RelayConfig::default());
    }

    #[tokio::test]
    async fn test_unreadable_location_is_an_error() {
        // A regular file used as a directory: the lookup fails with ENOTDIR, not "absent"
        let file = write_config("throttle_ms: 250\n");
        let err = RelayConfig::load_or_default(file.path().join("relay.yaml"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to check config file"));
    }
}
