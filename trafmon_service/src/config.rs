//! Service configuration.
//!
//! Settings come from `trafmon.toml`, or from the file named by `--config` /
//! `TRAFMON_CONFIG`. Every key is optional. `DATABASE_URL` from the environment, or from a
//! `.env` file, takes precedence over `[database] url`.

use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

use crate::error::{Result, TrafficError};
use crate::logging::LogLevel;
use crate::model::DEFAULT_SPEED_THRESHOLD;

pub const DEFAULT_CONFIG_PATH: &str = "trafmon.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub database: DatabaseConfig,
    pub analysis: AnalysisConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Speed at or below which an interval counts as congested.
    pub default_speed_threshold: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            default_speed_threshold: DEFAULT_SPEED_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub file: Option<String>,
    pub console_timestamps: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            file: None,
            console_timestamps: false,
        }
    }
}

impl ServiceConfig {
    /// Parses configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text)
            .map_err(|e| TrafficError::Validation(format!("invalid configuration: {}", e)))
    }

    /// Loads configuration, then applies environment overrides.
    ///
    /// An explicit path (`--config` or `TRAFMON_CONFIG`) must exist. Without
    /// one, `trafmon.toml` is read if present and defaults are used otherwise.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        dotenv::dotenv().ok();
        let mut config = match explicit {
            Some(path) => Self::load_file(path)?,
            None => Self::load_optional_file(Path::new(DEFAULT_CONFIG_PATH))?,
        };
        config.apply_env_overrides(env::var("DATABASE_URL").ok());
        Ok(config)
    }

    fn load_optional_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_file(path)
    }

    fn load_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            TrafficError::Validation(format!(
                "cannot read configuration {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&text)
    }

    fn apply_env_overrides(&mut self, database_url: Option<String>) {
        if let Some(url) = database_url.filter(|u| !u.trim().is_empty()) {
            self.database.url = Some(url);
        }
    }

    /// The database URL, required by every command that touches the store.
    pub fn database_url(&self) -> Result<&str> {
        self.database.url.as_deref().ok_or_else(|| {
            TrafficError::Validation(
                "DATABASE_URL is not set and [database] url is missing".to_string(),
            )
        })
    }
}
