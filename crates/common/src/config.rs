//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConvertError, ConvertResult};

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Default conversion settings, overridable per run.
    pub defaults: ConversionDefaults,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Default conversion parameters.
///
/// Values are kept as plain strings here; the timeline model parses them
/// into typed settings so this crate stays free of domain types.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionDefaults {
    /// Output dialect (`premiere` or `davinci`).
    pub format: String,

    /// Fallback duration for gap rows without a usable span (seconds).
    pub gap_seconds: f64,

    /// Run frame rate (e.g. "30", "29.97", "30000/1001").
    /// `None` uses the template's own rate.
    pub frame_rate: Option<String>,

    /// Lane policy for rows without a source file
    /// (`first-track`, `round-robin`, `speaker`).
    pub fallback: String,

    /// Empty time inserted between clips of different colors (seconds).
    pub block_spacing_seconds: f64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "csvtoxml_xml_export=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for ConversionDefaults {
    fn default() -> Self {
        Self {
            format: "premiere".to_string(),
            gap_seconds: 5.0,
            frame_rate: None,
            fallback: "first-track".to_string(),
            block_spacing_seconds: 0.0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match Self::load_from(&config_path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Ignoring config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Load config from an explicit path. Unlike [`AppConfig::load`], any
    /// problem with the file is an error.
    pub fn load_from(path: &Path) -> ConvertResult<Self> {
        if !path.exists() {
            return Err(ConvertError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| ConvertError::config(format!("{}: {e}", path.display())))
    }

    /// Save config to the standard location.
    pub fn save(&self) -> ConvertResult<()> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(config_path, json)?;
        Ok(())
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("csvtoxml").join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = AppConfig::default();
        assert_eq!(config.defaults.format, "premiere");
        assert!((config.defaults.gap_seconds - 5.0).abs() < 1e-9);
        assert!(config.defaults.frame_rate.is_none());
        assert_eq!(config.defaults.fallback, "first-track");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"defaults": {"format": "davinci"}}"#).unwrap();
        assert_eq!(config.defaults.format, "davinci");
        assert!((config.defaults.gap_seconds - 5.0).abs() < 1e-9);
        assert!(!config.logging.json);
    }

    #[test]
    fn test_load_from_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConvertError::Config { .. }));
    }

    #[test]
    fn test_load_from_missing_file() {
        let err = AppConfig::load_from(Path::new("/nonexistent/csvtoxml.json")).unwrap_err();
        assert!(matches!(err, ConvertError::FileNotFound { .. }));
    }
}
