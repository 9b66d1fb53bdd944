//! Configuration for hiproc
//!
//! Defaults, then `~/.hiproc/config.toml` if present, then the
//! `HIPROC_DB` and `HIPROC_LOG` environment variables.

use crate::db::models::{DEFAULT_ANALYTICS_DAYS, DEFAULT_SUGGESTION_LIMIT};
use crate::error::{RecallError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const APP_DIR: &str = ".hiproc";
const CONFIG_FILE: &str = "config.toml";
const DB_FILE: &str = "commands.db";

pub const DB_ENV: &str = "HIPROC_DB";
pub const LOG_ENV: &str = "HIPROC_LOG";

/// Runtime settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite database file
    pub database_path: PathBuf,

    /// Tracing filter directive, e.g. `info` or `hiproc_lib=debug`
    pub log_filter: String,

    /// Default number of suggestions
    pub suggestion_limit: usize,

    /// Default analytics window in days
    pub analytics_days: i64,

    /// Default number of similar commands
    pub similar_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: app_dir().join(DB_FILE),
            log_filter: "info".to_string(),
            suggestion_limit: DEFAULT_SUGGESTION_LIMIT,
            analytics_days: DEFAULT_ANALYTICS_DAYS,
            similar_limit: DEFAULT_SUGGESTION_LIMIT,
        }
    }
}

impl Config {
    /// Load from the default locations
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&app_dir().join(CONFIG_FILE))?;
        config.apply_overrides(std::env::var(DB_ENV).ok(), std::env::var(LOG_ENV).ok());
        config.validate()?;
        Ok(config)
    }

    /// Read a config file, falling back to defaults if it doesn't exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
            .map_err(|e| RecallError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| RecallError::Config(e.to_string()))
    }

    /// Environment values win over anything from the file; empty ones are ignored
    pub fn apply_overrides(&mut self, database: Option<String>, log_filter: Option<String>) {
        if let Some(path) = database.filter(|p| !p.trim().is_empty()) {
            self.database_path = PathBuf::from(path);
        }
        if let Some(filter) = log_filter.filter(|f| !f.trim().is_empty()) {
            self.log_filter = filter;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.database_path.as_os_str().is_empty() {
            return Err(RecallError::Config("database_path is empty".to_string()));
        }
        if self.suggestion_limit == 0 {
            return Err(RecallError::Config("suggestion_limit must be at least 1".to_string()));
        }
        if self.similar_limit == 0 {
            return Err(RecallError::Config("similar_limit must be at least 1".to_string()));
        }
        if self.analytics_days < 0 {
            return Err(RecallError::Config("analytics_days cannot be negative".to_string()));
        }
        EnvFilter::try_new(&self.log_filter)
            .map_err(|e| RecallError::Config(format!("log_filter: {}", e)))?;

        Ok(())
    }
}

fn app_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.suggestion_limit, 5);
        assert_eq!(config.analytics_days, 30);
        assert_eq!(config.log_filter, "info");
        assert!(config.database_path.ends_with(".hiproc/commands.db"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml("suggestion_limit = 8\nlog_filter = \"debug\"\n").unwrap();
        assert_eq!(config.suggestion_limit, 8);
        assert_eq!(config.log_filter, "debug");
        assert_eq!(config.analytics_days, 30);
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        let result = Config::from_toml("suggestion_limit = \"many\"");
        assert!(matches!(result, Err(RecallError::Config(_))));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp = tempfile::TempDir::new().unwrap();
        let config = Config::load_from(&temp.path().join("nope.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_file_and_overrides() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "database_path = \"/var/lib/hiproc.db\"\nsimilar_limit = 3\n").unwrap();

        let mut config = Config::load_from(&path).unwrap();
        assert_eq!(config.database_path, PathBuf::from("/var/lib/hiproc.db"));
        assert_eq!(config.similar_limit, 3);

        config.apply_overrides(Some("/tmp/other.db".to_string()), Some(String::new()));
        assert_eq!(config.database_path, PathBuf::from("/tmp/other.db"));
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = Config {
            suggestion_limit: 0,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(RecallError::Config(_))));

        let config = Config {
            analytics_days: -1,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            log_filter: "hiproc=notalevel".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
