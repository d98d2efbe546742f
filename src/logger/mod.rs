//! Structured logging for the lending core
//!
//! Tag + level based logging with colored console output. Each subsystem logs
//! under its own [`LogTag`]; debug output is gated by the global
//! [`LoggerConfig`] minimum level.
//!
//! Call `logger::init()` once at startup, then use the level functions:
//!
//! ```rust
//! use nftlend::logger::{self, LogTag};
//!
//! logger::info(LogTag::Valuation, "Resolved floor price");
//! logger::debug(LogTag::Router, "Candidate discarded: shared fund source");
//! ```

use chrono::Utc;
use colored::Colorize;
use once_cell::sync::OnceCell;
use std::sync::RwLock;

/// Subsystem tags for log filtering and display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTag {
    Chain,
    Config,
    Directory,
    Loans,
    Marketplace,
    Pools,
    Router,
    Signer,
    Valuation,
}

impl LogTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogTag::Chain => "CHAIN",
            LogTag::Config => "CONFIG",
            LogTag::Directory => "DIRECTORY",
            LogTag::Loans => "LOANS",
            LogTag::Marketplace => "MARKETPLACE",
            LogTag::Pools => "POOLS",
            LogTag::Router => "ROUTER",
            LogTag::Signer => "SIGNER",
            LogTag::Valuation => "VALUATION",
        }
    }
}

/// Log levels ordered by severity (Error < Warning < Info < Debug)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error = 0,
    Warning = 1,
    Info = 2,
    Debug = 3,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warning => "WARNING",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
        }
    }
}

/// Global logger configuration
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub min_level: LogLevel,
    /// Suppress console output entirely (used by tests)
    pub quiet: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
            quiet: false,
        }
    }
}

static LOGGER_CONFIG: OnceCell<RwLock<LoggerConfig>> = OnceCell::new();

fn config_cell() -> &'static RwLock<LoggerConfig> {
    LOGGER_CONFIG.get_or_init(|| RwLock::new(LoggerConfig::default()))
}

/// Initialize the logger with default settings.
///
/// Call once at startup before any logging occurs.
pub fn init() {
    let _ = config_cell();
}

/// Replace the logger configuration (e.g. to raise verbosity to Debug).
pub fn set_logger_config(config: LoggerConfig) {
    if let Ok(mut current) = config_cell().write() {
        *current = config;
    }
}

pub fn get_logger_config() -> LoggerConfig {
    config_cell()
        .read()
        .map(|c| c.clone())
        .unwrap_or_default()
}

fn should_log(level: LogLevel) -> bool {
    let config = get_logger_config();
    if config.quiet {
        return false;
    }
    // Errors always log
    level == LogLevel::Error || level <= config.min_level
}

fn log_internal(tag: LogTag, level: LogLevel, message: &str) {
    if !should_log(level) {
        return;
    }

    let timestamp = Utc::now().format("%H:%M:%S%.3f");
    let level_str = match level {
        LogLevel::Error => level.as_str().red().bold(),
        LogLevel::Warning => level.as_str().yellow(),
        LogLevel::Info => level.as_str().green(),
        LogLevel::Debug => level.as_str().dimmed(),
    };

    println!(
        "{} {:>7} [{}] {}",
        timestamp.to_string().dimmed(),
        level_str,
        tag.as_str().cyan(),
        message
    );
}

/// Log at ERROR level (always shown)
pub fn error(tag: LogTag, message: &str) {
    log_internal(tag, LogLevel::Error, message);
}

/// Log at WARNING level
pub fn warning(tag: LogTag, message: &str) {
    log_internal(tag, LogLevel::Warning, message);
}

/// Log at INFO level (default)
pub fn info(tag: LogTag, message: &str) {
    log_internal(tag, LogLevel::Info, message);
}

/// Log at DEBUG level (gated by `LoggerConfig::min_level`)
pub fn debug(tag: LogTag, message: &str) {
    log_internal(tag, LogLevel::Debug, message);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering() {
        assert!(LogLevel::Error < LogLevel::Warning);
        assert!(LogLevel::Info < LogLevel::Debug);
    }
}
