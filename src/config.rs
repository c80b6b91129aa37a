//! Configuration management for dualcast

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Dual-output mode configuration
    #[serde(default)]
    pub dual_output: DualOutputConfig,

    /// Streaming service configuration
    #[serde(default)]
    pub stream: StreamConfig,

    /// Path to config file (not serialized)
    #[serde(skip)]
    config_path: Option<PathBuf>,
}

/// Which output pipeline profile handlers are built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputProfile {
    /// Streamlined pipeline with shared encoder settings
    Simple,
    /// Fully configurable per-output pipeline
    Advanced,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DualOutputConfig {
    /// Whether the secondary (vertical) surface is enabled
    #[serde(default)]
    pub enabled: bool,

    /// Output profile used when (re)building handlers
    #[serde(default = "default_profile")]
    pub profile: OutputProfile,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StreamConfig {
    /// Service endpoint for the primary (horizontal) stream
    pub primary: Option<ServiceConfig>,

    /// Service endpoint for the secondary (vertical) stream
    pub secondary: Option<ServiceConfig>,

    /// Session ID (auto-generated if not set)
    pub session_id: Option<String>,
}

/// Connection settings for one streaming service endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Ingest server URL
    pub server: String,

    /// Stream key
    pub key: String,

    /// Service-specific settings passed through to the output pipeline
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub settings: serde_json::Value,
}

impl ServiceConfig {
    pub fn new(server: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            key: key.into(),
            settings: serde_json::Value::Null,
        }
    }
}

// Default value functions
fn default_profile() -> OutputProfile {
    OutputProfile::Simple
}

impl Default for DualOutputConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            profile: default_profile(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dual_output: DualOutputConfig::default(),
            stream: StreamConfig::default(),
            config_path: None,
        }
    }
}

impl Config {
    /// Load configuration from default location or create default
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

            let mut config: Config = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {:?}", config_path))?;

            config.config_path = Some(config_path);
            Ok(config)
        } else {
            // Create default config
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = match self.config_path.clone() {
            Some(path) => path,
            None => Self::default_config_path()?,
        };

        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&config_path, contents)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        Ok(())
    }

    /// Get the config file path
    pub fn config_path(&self) -> Result<PathBuf> {
        match self.config_path.clone() {
            Some(path) => Ok(path),
            None => Self::default_config_path(),
        }
    }

    /// Get default config path
    fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = directories::ProjectDirs::from("dev", "dualcast", "dualcast")
            .context("Failed to determine config directory")?;

        Ok(proj_dirs.config_dir().join("config.toml"))
    }

    /// Get or generate session ID
    pub fn session_id(&self) -> String {
        self.stream
            .session_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
    }

    /// Generate and remember a session ID if one is not set, returning it
    pub fn ensure_session_id(&mut self) -> &str {
        if self.stream.session_id.is_none() {
            self.stream.session_id = Some(uuid::Uuid::new_v4().to_string());
        }
        self.stream.session_id.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert!(!config.dual_output.enabled);
        assert_eq!(config.dual_output.profile, OutputProfile::Simple);
        assert!(config.stream.primary.is_none());
        assert!(config.stream.secondary.is_none());
    }

    #[test]
    fn test_config_parse_toml() {
        let toml_str = r#"
            [dual_output]
            enabled = true
            profile = "advanced"

            [stream.primary]
            server = "rtmp://a.example.com/live"
            key = "abc123"

            [stream.secondary]
            server = "rtmp://b.example.com/live"
            key = "def456"
            settings = { low_latency = true }
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert!(config.dual_output.enabled);
        assert_eq!(config.dual_output.profile, OutputProfile::Advanced);

        let primary = config.stream.primary.unwrap();
        assert_eq!(primary.server, "rtmp://a.example.com/live");
        assert_eq!(primary.key, "abc123");
        assert!(primary.settings.is_null());

        let secondary = config.stream.secondary.unwrap();
        assert_eq!(secondary.settings["low_latency"], true);
    }

    #[test]
    fn test_config_missing_sections_use_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert!(!config.dual_output.enabled);
        assert_eq!(config.dual_output.profile, OutputProfile::Simple);
    }

    #[test]
    fn test_ensure_session_id_is_stable() {
        let mut config = Config::default();
        let first = config.ensure_session_id().to_string();
        let second = config.ensure_session_id().to_string();
        assert_eq!(first, second);
        assert!(!first.is_empty());
    }
}
