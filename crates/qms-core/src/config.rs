//! Application configuration management.
//!
//! Handles loading, saving, and validating QMS configuration including:
//! - Ticket label format (prefix and zero-padded width)
//! - Snapshot display limits
//! - Clock UTC offset
//! - HTTP server bind address

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{QmsError, Result};

static LABEL_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z]{1,3}$").expect("valid label prefix regex"));

/// Returns `true` if `value` is a usable ticket label prefix
/// (1-3 ASCII letters).
#[must_use]
pub fn is_valid_label_prefix(value: &str) -> bool {
    LABEL_PREFIX.is_match(value)
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QmsConfig {
    /// Queue behavior settings.
    pub queue: QueueConfig,

    /// Clock settings.
    pub clock: ClockConfig,

    /// HTTP server settings.
    pub server: ServerConfig,
}

/// Queue behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Prefix for ticket labels (e.g. "T" in "T007").
    pub label_prefix: String,

    /// Zero-padded width of the numeric part of a label.
    pub label_width: usize,

    /// How many recently skipped tickets a queue snapshot carries.
    pub skipped_display_limit: usize,

    /// How many status-change audit entries are retained.
    pub audit_retention: usize,
}

/// Clock settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// Fixed UTC offset of the service desk, in minutes.
    pub utc_offset_minutes: i32,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind (e.g. "0.0.0.0").
    pub bind_addr: String,

    /// TCP port.
    pub port: u16,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            label_prefix: "T".to_string(),
            label_width: 3,
            skipped_display_limit: 5,
            audit_retention: 200,
        }
    }
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: 0,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for QmsConfig {
    fn default() -> Self {
        Self {
            queue: QueueConfig::default(),
            clock: ClockConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl QmsConfig {
    /// Load configuration from the default path, falling back to defaults
    /// if no file exists yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, parsed, or
    /// validated.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from a specific path, falling back to defaults
    /// if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, parsed, or
    /// validated.
    pub fn load_from(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content).map_err(|e| QmsError::ConfigParse(e.to_string()))?
        } else {
            Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default path.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be written.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| QmsError::ConfigParse(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate all fields.
    ///
    /// # Errors
    ///
    /// Returns `ConfigValidation` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if !is_valid_label_prefix(&self.queue.label_prefix) {
            return Err(QmsError::ConfigValidation(format!(
                "queue.label_prefix must be 1-3 ASCII letters (got '{}')",
                self.queue.label_prefix
            )));
        }
        if !(1..=6).contains(&self.queue.label_width) {
            return Err(QmsError::ConfigValidation(format!(
                "queue.label_width must be between 1 and 6 (got {})",
                self.queue.label_width
            )));
        }
        if self.queue.skipped_display_limit == 0 {
            return Err(QmsError::ConfigValidation(
                "queue.skipped_display_limit must be at least 1".to_string(),
            ));
        }
        if !(-18 * 60..=18 * 60).contains(&self.clock.utc_offset_minutes) {
            return Err(QmsError::ConfigValidation(format!(
                "clock.utc_offset_minutes must be within +/-1080 (got {})",
                self.clock.utc_offset_minutes
            )));
        }
        if self.server.port == 0 {
            return Err(QmsError::ConfigValidation(
                "server.port must be nonzero".to_string(),
            ));
        }
        Ok(())
    }

    /// Get the configuration file path.
    ///
    /// On Linux deployments: `/etc/qms/config.toml`.
    /// Elsewhere: the platform config directory.
    fn config_path() -> Result<PathBuf> {
        #[cfg(target_os = "linux")]
        {
            Ok(PathBuf::from("/etc/qms/config.toml"))
        }
        #[cfg(not(target_os = "linux"))]
        {
            let dirs = directories::ProjectDirs::from("", "", "qms").ok_or_else(|| {
                QmsError::ConfigValidation("Cannot determine config directory".into())
            })?;
            Ok(dirs.config_dir().join("config.toml"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = QmsConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.queue.label_prefix, "T");
        assert_eq!(config.queue.label_width, 3);
        assert!(config.server.port != 0);
    }

    #[test]
    fn test_label_prefix_validation() {
        assert!(is_valid_label_prefix("T"));
        assert!(is_valid_label_prefix("QA"));
        assert!(!is_valid_label_prefix(""));
        assert!(!is_valid_label_prefix("TOOL"));
        assert!(!is_valid_label_prefix("T1"));
    }

    #[test]
    fn test_invalid_fields_rejected() {
        let mut config = QmsConfig::default();
        config.queue.label_width = 0;
        assert!(config.validate().is_err());

        let mut config = QmsConfig::default();
        config.clock.utc_offset_minutes = 20 * 60;
        assert!(config.validate().is_err());

        let mut config = QmsConfig::default();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = QmsConfig::load_from(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(config.queue.label_prefix, "T");
    }

    #[test]
    fn test_load_from_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[queue]\nlabel_prefix = \"Q\"\n").unwrap();

        let config = QmsConfig::load_from(&path).unwrap();
        assert_eq!(config.queue.label_prefix, "Q");
        // untouched sections keep their defaults
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn test_load_from_rejects_bad_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[queue]\nlabel_prefix = \"2025\"\n").unwrap();
        assert!(QmsConfig::load_from(&path).is_err());
    }

    #[test]
    fn test_roundtrip_through_toml() {
        let config = QmsConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: QmsConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.queue.label_prefix, config.queue.label_prefix);
        assert_eq!(parsed.clock.utc_offset_minutes, 0);
    }
}
