use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::engine::DEFAULT_MAX_WINDOW_DAYS;
use crate::logging::LogConfig;
use crate::models::UserId;
use crate::policy::ScoringPolicy;

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application metadata
    pub metadata: ConfigMetadata,

    /// General application settings
    pub settings: AppSettings,

    /// Logging output
    #[serde(default)]
    pub logging: LogConfig,

    /// Reference ranges, weights, status bands and insight thresholds
    #[serde(default)]
    pub scoring: ScoringPolicy,
}

/// Configuration metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigMetadata {
    /// Configuration format version
    pub version: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

/// General application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSettings {
    /// Data directory path
    pub data_dir: PathBuf,

    /// SQLite database file, defaults to `wellrs.db` inside `data_dir`
    pub database_path: Option<PathBuf>,

    /// User the CLI acts for when `--user` is not given
    pub default_user_id: UserId,

    /// Largest accepted trailing window
    pub max_window_days: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        let now = Utc::now();

        AppConfig {
            metadata: ConfigMetadata {
                version: "1.0".to_string(),
                created_at: now,
                updated_at: now,
            },
            settings: AppSettings::default(),
            logging: LogConfig::default(),
            scoring: ScoringPolicy::default(),
        }
    }
}

impl Default for AppSettings {
    fn default() -> Self {
        AppSettings {
            data_dir: dirs::data_dir()
                .map(|dir| dir.join("wellrs"))
                .unwrap_or_else(|| PathBuf::from("./data")),
            database_path: None,
            default_user_id: 1,
            max_window_days: DEFAULT_MAX_WINDOW_DAYS,
        }
    }
}

impl AppSettings {
    pub fn resolved_database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join("wellrs.db"))
    }
}

/// Configuration management implementation
impl AppConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: AppConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML configuration")?;

        config
            .validate()
            .with_context(|| format!("Invalid configuration in {}", path.as_ref().display()))?;

        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.metadata.updated_at = Utc::now();

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        let toml_content = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize configuration to TOML")?;

        fs::write(&path, toml_content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Get default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".wellrs")
            .join("config.toml")
    }

    /// Load the file at `path` (or the default path) if it exists, otherwise use defaults
    ///
    /// A file that exists but fails to parse or validate is an error.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        let config_path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::default_config_path);

        if config_path.exists() {
            Self::load_from_file(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Check the scoring policy and window limits
    pub fn validate(&self) -> Result<()> {
        self.scoring
            .validate()
            .with_context(|| "Invalid scoring policy")?;

        if self.settings.max_window_days == 0 {
            bail!("settings.max_window_days must be at least 1");
        }
        if self.scoring.default_window_days > self.settings.max_window_days {
            bail!(
                "scoring.default_window_days ({}) exceeds settings.max_window_days ({})",
                self.scoring.default_window_days,
                self.settings.max_window_days
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MetricKind;
    use tempfile::tempdir;

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: AppConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.metadata.version, deserialized.metadata.version);
        assert_eq!(config.scoring, deserialized.scoring);
        assert_eq!(config.settings, deserialized.settings);
    }

    #[test]
    fn test_config_file_io() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.toml");

        let mut original = AppConfig::default();
        original.settings.default_user_id = 42;
        original
            .scoring
            .metrics
            .get_mut(&MetricKind::SleepDuration)
            .unwrap()
            .weight = 0.3;

        original.save_to_file(&config_path).unwrap();
        let loaded = AppConfig::load_from_file(&config_path).unwrap();

        assert_eq!(loaded.settings.default_user_id, 42);
        assert_eq!(loaded.scoring.weight(MetricKind::SleepDuration), 0.3);
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let toml_str = r#"
            [metadata]
            version = "1.0"
            created_at = "2024-01-01T00:00:00Z"
            updated_at = "2024-01-01T00:00:00Z"

            [settings]
            data_dir = "/tmp/wellrs"
            default_user_id = 7
            max_window_days = 90
        "#;

        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.scoring, ScoringPolicy::default());
        assert_eq!(
            config.settings.resolved_database_path(),
            PathBuf::from("/tmp/wellrs/wellrs.db")
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_policy_fails_to_load() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        let mut config = AppConfig::default();
        config.scoring.bands.good = 99.0;
        config.save_to_file(&config_path).unwrap();

        assert!(AppConfig::load_from_file(&config_path).is_err());
    }

    #[test]
    fn test_load_or_default_without_file() {
        let temp_dir = tempdir().unwrap();
        let config = AppConfig::load_or_default(Some(temp_dir.path().join("absent.toml").as_path())).unwrap();
        assert_eq!(config.settings.max_window_days, DEFAULT_MAX_WINDOW_DAYS);
    }

    #[test]
    fn test_default_window_must_fit_maximum() {
        let mut config = AppConfig::default();
        config.settings.max_window_days = 7;
        assert!(config.validate().is_err());
    }
}
