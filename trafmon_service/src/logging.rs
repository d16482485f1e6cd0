//! Structured logging for the traffic monitoring service
//!
//! Provides context-rich logging with component and camera identifiers,
//! timestamps, and severity levels. Supports both console output
//! and file-based logging for long-running ingestion.

use chrono::Utc;
use serde::Deserialize;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::Mutex;

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    #[serde(alias = "warn")]
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

// ---------------------------------------------------------------------------
// Components
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Ingest,
    Classifier,
    Alerts,
    Analytics,
    Database,
    System,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::Ingest => write!(f, "INGEST"),
            Component::Classifier => write!(f, "CLASSIFY"),
            Component::Alerts => write!(f, "ALERT"),
            Component::Analytics => write!(f, "ANALYTICS"),
            Component::Database => write!(f, "DB"),
            Component::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Logger Configuration
// ---------------------------------------------------------------------------

/// Global logger instance
static LOGGER: Mutex<Option<Logger>> = Mutex::new(None);

pub struct Logger {
    /// Minimum log level to display
    min_level: LogLevel,
    /// Optional file path for logging
    log_file: Option<String>,
    /// Whether to include timestamps in console output
    console_timestamps: bool,
}

impl Logger {
    /// Initialize the global logger
    pub fn init(min_level: LogLevel, log_file: Option<String>, console_timestamps: bool) {
        let logger = Logger {
            min_level,
            log_file,
            console_timestamps,
        };

        if let Ok(mut slot) = LOGGER.lock() {
            *slot = Some(logger);
        }
    }

    fn format_entry(
        level: LogLevel,
        component: Component,
        camera_id: Option<i32>,
        message: &str,
    ) -> String {
        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
        let camera_part = camera_id.map(|id| format!(" [cam {}]", id)).unwrap_or_default();
        format!("{} {} {}{}: {}", timestamp, level, component, camera_part, message)
    }

    fn log(&self, level: LogLevel, component: Component, camera_id: Option<i32>, message: &str) {
        if level < self.min_level {
            return;
        }

        let log_entry = Self::format_entry(level, component, camera_id, message);
        let camera_part = camera_id.map(|id| format!(" [cam {}]", id)).unwrap_or_default();

        // Console output; stdout is reserved for command results.
        if self.console_timestamps {
            eprintln!("{}", log_entry);
        } else {
            match level {
                LogLevel::Error => eprintln!("   ✗ {}{}: {}", component, camera_part, message),
                LogLevel::Warning => eprintln!("   ⚠ {}{}: {}", component, camera_part, message),
                LogLevel::Info => eprintln!("   {}", message),
                LogLevel::Debug => eprintln!("   [DEBUG] {}{}: {}", component, camera_part, message),
            }
        }

        if let Some(ref path) = self.log_file {
            if let Err(e) = Self::append_to_file(path, &log_entry) {
                eprintln!("Failed to write to log file {}: {}", path, e);
            }
        }
    }

    fn append_to_file(path: &str, entry: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        writeln!(file, "{}", entry)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

/// Initialize the global logger
pub fn init_logger(min_level: LogLevel, log_file: Option<&str>, console_timestamps: bool) {
    Logger::init(min_level, log_file.map(String::from), console_timestamps);
}

fn dispatch(level: LogLevel, component: Component, camera_id: Option<i32>, message: &str) {
    if let Ok(guard) = LOGGER.lock() {
        if let Some(logger) = guard.as_ref() {
            logger.log(level, component, camera_id, message);
        }
    }
}

/// Log a general informational message
pub fn info(component: Component, camera_id: Option<i32>, message: &str) {
    dispatch(LogLevel::Info, component, camera_id, message);
}

/// Log a warning message
pub fn warn(component: Component, camera_id: Option<i32>, message: &str) {
    dispatch(LogLevel::Warning, component, camera_id, message);
}

/// Log an error message
pub fn error(component: Component, camera_id: Option<i32>, message: &str) {
    dispatch(LogLevel::Error, component, camera_id, message);
}

/// Log a debug message
pub fn debug(component: Component, camera_id: Option<i32>, message: &str) {
    dispatch(LogLevel::Debug, component, camera_id, message);
}

// ---------------------------------------------------------------------------
// Structured Failure Logging
// ---------------------------------------------------------------------------

/// Log a failed operation. Storage failures are errors; validation and
/// not-found outcomes are expected and only reach the debug level.
pub fn log_failure(
    component: Component,
    camera_id: Option<i32>,
    operation: &str,
    err: &crate::error::TrafficError,
) {
    use crate::error::TrafficError;

    let message = format!("{} failed: {}", operation, err);
    match err {
        TrafficError::Storage(_) => error(component, camera_id, &message),
        TrafficError::Validation(_) | TrafficError::NotFound(_) => {
            debug(component, camera_id, &message)
        }
    }
}

// ---------------------------------------------------------------------------
// Batch Summary Logging
// ---------------------------------------------------------------------------

/// Log a summary of a batch import
pub fn log_batch_summary(component: Component, total: usize, successful: usize, failed: usize) {
    let message = format!(
        "Import complete: {}/{} successful, {} failed",
        successful, total, failed
    );

    match batch_summary_level(successful, failed) {
        LogLevel::Error => error(component, None, &message),
        LogLevel::Warning => warn(component, None, &message),
        _ => info(component, None, &message),
    }
}

fn batch_summary_level(successful: usize, failed: usize) -> LogLevel {
    if failed == 0 {
        LogLevel::Info
    } else if successful == 0 {
        LogLevel::Error
    } else {
        LogLevel::Warning
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warning);
        assert!(LogLevel::Warning < LogLevel::Error);
    }

    #[test]
    fn test_batch_summary_level() {
        assert_eq!(batch_summary_level(10, 0), LogLevel::Info);
        assert_eq!(batch_summary_level(0, 0), LogLevel::Info);
        assert_eq!(batch_summary_level(0, 3), LogLevel::Error);
        assert_eq!(batch_summary_level(7, 3), LogLevel::Warning);
    }

    #[test]
    fn test_entry_includes_component_and_camera() {
        let entry = Logger::format_entry(LogLevel::Warning, Component::Alerts, Some(4), "jam");
        assert!(entry.contains("WARN ALERT [cam 4]: jam"), "got '{}'", entry);

        let entry = Logger::format_entry(LogLevel::Info, Component::System, None, "ready");
        assert!(entry.ends_with("INFO SYS: ready"), "got '{}'", entry);
    }

    #[test]
    fn test_level_parses_from_config_strings() {
        #[derive(Deserialize)]
        struct Wrapper {
            level: LogLevel,
        }
        let w: Wrapper = toml::from_str("level = \"warn\"").unwrap();
        assert_eq!(w.level, LogLevel::Warning);
        let w: Wrapper = toml::from_str("level = \"debug\"").unwrap();
        assert_eq!(w.level, LogLevel::Debug);
    }
}
