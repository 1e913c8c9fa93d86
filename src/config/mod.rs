//! Configuration management for the metronome
//!
//! Handles loading, validating and hot-reloading the YAML configuration.
//! Every field has a default, so an empty or missing file is a valid config.

pub mod watcher;

use crate::controller::{BpmRange, DEFAULT_MAX_BPM, DEFAULT_MIN_BPM};
use crate::host::DEFAULT_SESSION_KEY;
use crate::store::{SharedMetronomeState, DEFAULT_BPM};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tokio::fs;

pub use watcher::ConfigWatcher;

/// Rejected configuration values
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("min_bpm must be greater than 0")]
    ZeroMinBpm,

    #[error("min_bpm ({min}) is greater than max_bpm ({max})")]
    InvertedRange { min: u32, max: u32 },

    #[error("default_bpm ({bpm}) is outside {min}-{max}")]
    DefaultOutOfRange { bpm: u32, min: u32, max: u32 },

    #[error("peers must be at least 1")]
    NoPeers,
}

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub metronome: MetronomeConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// Tempo limits and the tempo a new session starts with
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MetronomeConfig {
    #[serde(default = "default_min_bpm")]
    pub min_bpm: u32,
    #[serde(default = "default_max_bpm")]
    pub max_bpm: u32,
    #[serde(default = "default_bpm")]
    pub default_bpm: u32,
}

/// Shared session settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SessionConfig {
    #[serde(default = "default_session_key")]
    pub key: String,
    /// Number of peers the demo binary mounts
    #[serde(default = "default_peers")]
    pub peers: usize,
}

impl MetronomeConfig {
    pub fn range(&self) -> BpmRange {
        BpmRange::new(self.min_bpm, self.max_bpm)
    }

    /// State seeding a session that does not exist yet
    pub fn default_state(&self) -> SharedMetronomeState {
        SharedMetronomeState::new(self.default_bpm)
    }
}

impl Default for MetronomeConfig {
    fn default() -> Self {
        Self {
            min_bpm: default_min_bpm(),
            max_bpm: default_max_bpm(),
            default_bpm: default_bpm(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            key: default_session_key(),
            peers: default_peers(),
        }
    }
}

impl AppConfig {
    /// Load and validate configuration from file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config = Self::parse(&contents)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load the file if it exists, otherwise use the defaults
    pub async fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if fs::try_exists(path).await.unwrap_or(false) {
            Self::load(path).await
        } else {
            tracing::info!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Parse and validate YAML text
    pub fn parse(contents: &str) -> Result<Self> {
        // An empty document deserializes to unit, not to an empty mapping
        let config: AppConfig = if contents.trim().is_empty() {
            AppConfig::default()
        } else {
            serde_yaml::from_str(contents).context("Failed to parse YAML config")?
        };

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let yaml = serde_yaml::to_string(self).context("Failed to serialize config to YAML")?;

        fs::write(path, yaml)
            .await
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let MetronomeConfig {
            min_bpm,
            max_bpm,
            default_bpm,
        } = self.metronome;

        if min_bpm == 0 {
            return Err(ConfigError::ZeroMinBpm);
        }
        if min_bpm > max_bpm {
            return Err(ConfigError::InvertedRange {
                min: min_bpm,
                max: max_bpm,
            });
        }
        if default_bpm < min_bpm || default_bpm > max_bpm {
            return Err(ConfigError::DefaultOutOfRange {
                bpm: default_bpm,
                min: min_bpm,
                max: max_bpm,
            });
        }
        if self.session.peers == 0 {
            return Err(ConfigError::NoPeers);
        }

        Ok(())
    }
}

// Default value functions
fn default_min_bpm() -> u32 { DEFAULT_MIN_BPM }
fn default_max_bpm() -> u32 { DEFAULT_MAX_BPM }
fn default_bpm() -> u32 { DEFAULT_BPM }
fn default_session_key() -> String { DEFAULT_SESSION_KEY.to_string() }
fn default_peers() -> usize { 2 }

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.metronome.range(), BpmRange::new(40, 208));
        assert_eq!(config.metronome.default_bpm, 100);
        assert_eq!(config.session.key, "metronome");
        assert_eq!(config.session.peers, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_file_fills_defaults() {
        let config = AppConfig::parse(
            r#"
metronome:
  max_bpm: 240
session:
  key: "room-42"
"#,
        )
        .unwrap();

        assert_eq!(config.metronome.min_bpm, 40);
        assert_eq!(config.metronome.max_bpm, 240);
        assert_eq!(config.session.key, "room-42");
        assert_eq!(config.session.peers, 2);
    }

    #[test]
    fn test_parse_empty_document() {
        assert_eq!(AppConfig::parse("").unwrap(), AppConfig::default());
    }

    #[test]
    fn test_validate_rejects_bad_limits() {
        let mut config = AppConfig::default();

        config.metronome.min_bpm = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroMinBpm));

        config.metronome.min_bpm = 220;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvertedRange { min: 220, max: 208 })
        ));

        config.metronome.min_bpm = 40;
        config.metronome.default_bpm = 300;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DefaultOutOfRange { bpm: 300, .. })
        ));

        config.metronome.default_bpm = 100;
        config.session.peers = 0;
        assert_eq!(config.validate(), Err(ConfigError::NoPeers));
    }

    #[test]
    fn test_parse_rejects_invalid_limits() {
        let result = AppConfig::parse("metronome:\n  min_bpm: 300\n");
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_save_and_load() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("metronome.yaml");

        let mut config = AppConfig::default();
        config.metronome.default_bpm = 90;
        config.session.peers = 3;
        config.save(&path).await?;

        let loaded = AppConfig::load(&path).await?;
        assert_eq!(loaded, config);
        Ok(())
    }

    #[tokio::test]
    async fn test_load_or_default_without_file() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config = AppConfig::load_or_default(temp_dir.path().join("missing.yaml")).await?;
        assert_eq!(config, AppConfig::default());
        Ok(())
    }
}
