//! CLI Configuration.
//!
//! Where the CLI keeps its protocol snapshot and how it prints results.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::output::OutputFormat;

// ═══════════════════════════════════════════════════════════════════════════════
// CLI CONFIGURATION
// ═══════════════════════════════════════════════════════════════════════════════

/// CLI Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Protocol snapshot file
    pub state_path: PathBuf,
    /// Protocol configuration used by `init`; defaults apply when unset
    pub protocol_config: Option<PathBuf>,
    /// Output format
    pub format: OutputFormat,
    /// Colored output
    pub color: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            state_path: default_data_dir().join("state.json"),
            protocol_config: None,
            format: OutputFormat::Text,
            color: true,
        }
    }
}

impl CliConfig {
    /// Create configuration for a snapshot file
    pub fn new(state_path: impl Into<PathBuf>) -> Self {
        Self {
            state_path: state_path.into(),
            ..Default::default()
        }
    }

    /// Load from file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Save to file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content =
            serde_json::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Io(e.to_string()))?;
        }

        std::fs::write(path, content).map_err(|e| ConfigError::Io(e.to_string()))
    }

    /// Load from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("STABLECASH_STATE") {
            config.state_path = PathBuf::from(path);
        }

        if let Ok(path) = std::env::var("STABLECASH_CONFIG") {
            config.protocol_config = Some(PathBuf::from(path));
        }

        if let Ok(format) = std::env::var("STABLECASH_FORMAT") {
            config.format = format.parse().map_err(ConfigError::Validation)?;
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.color = false;
        }

        Ok(config)
    }

    /// Get default config file path
    pub fn default_path() -> PathBuf {
        default_data_dir().join("cli.json")
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.state_path.as_os_str().is_empty() {
            return Err(ConfigError::Validation("state path cannot be empty".into()));
        }
        if self.state_path.is_dir() {
            return Err(ConfigError::Validation(format!(
                "state path {} is a directory",
                self.state_path.display()
            )));
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONFIG ERROR
// ═══════════════════════════════════════════════════════════════════════════════

/// Configuration error
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(String),
    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),
    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),
    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

// ═══════════════════════════════════════════════════════════════════════════════
// HELPER FUNCTIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Get default data directory
fn default_data_dir() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(".stablecash");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join("Library/Application Support/Stablecash");
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata).join("Stablecash");
        }
    }

    PathBuf::from(".stablecash")
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = CliConfig::default();
        assert_eq!(config.format, OutputFormat::Text);
        assert!(config.state_path.ends_with("state.json"));
    }

    #[test]
    fn test_config_validation() {
        let dir = tempfile::tempdir().unwrap();
        assert!(CliConfig::new(dir.path().join("state.json")).validate().is_ok());
        assert!(CliConfig::new(dir.path()).validate().is_err());
        assert!(CliConfig::new("").validate().is_err());
    }

    #[test]
    fn test_config_save_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cli.json");

        let mut config = CliConfig::new(dir.path().join("state.json"));
        config.format = OutputFormat::JsonPretty;
        config.save(&path).unwrap();

        let loaded = CliConfig::load(&path).unwrap();
        assert_eq!(loaded.state_path, config.state_path);
        assert_eq!(loaded.format, OutputFormat::JsonPretty);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cli.json");
        std::fs::write(&path, r#"{ "format": "json" }"#).unwrap();

        let loaded = CliConfig::load(&path).unwrap();
        assert_eq!(loaded.format, OutputFormat::Json);
        assert!(loaded.color);
    }
}
