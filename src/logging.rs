//! Logging for shotness
//!
//! A `log` backend writing either plain text lines
//! (`YYYY-MM-DD HH:MM:SS [LEVEL] message`) or JSON lines to the console
//! (stderr), a file, or both. Console and file have independent levels.
//!
//! ```text
//! let config = LogConfig {
//!     console_level: LevelFilter::Info,
//!     file_level: Some(LevelFilter::Debug),
//!     format: LogFormat::Json,
//!     destination: LogDestination::Both(PathBuf::from("shotness.log")),
//! };
//! init_logger(config)?;
//! ```

use anyhow::{Context, Result};
use chrono::Local;
use log::{Level, LevelFilter, Log, Metadata, Record};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("text") {
            Ok(LogFormat::Text)
        } else if s.eq_ignore_ascii_case("json") {
            Ok(LogFormat::Json)
        } else {
            Err(format!("Unknown log format '{}'. Expected text or json", s))
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LogDestination {
    Console,
    File(PathBuf),
    Both(PathBuf),
}

impl LogDestination {
    fn file_path(&self) -> Option<&Path> {
        match self {
            LogDestination::Console => None,
            LogDestination::File(path) | LogDestination::Both(path) => Some(path),
        }
    }

    fn includes_console(&self) -> bool {
        !matches!(self, LogDestination::File(_))
    }
}

/// One JSON log line
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonLogEntry {
    pub timestamp: String,
    pub level: String,
    pub message: String,
    /// Emitting module, present for debug and trace records
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub console_level: LevelFilter,
    /// Level for the log file, defaulting to the console level
    pub file_level: Option<LevelFilter>,
    pub format: LogFormat,
    pub destination: LogDestination,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            console_level: LevelFilter::Info,
            file_level: None,
            format: LogFormat::Text,
            destination: LogDestination::Console,
        }
    }
}

impl LogConfig {
    /// Most verbose level any destination accepts
    pub fn max_level(&self) -> LevelFilter {
        match self.destination.file_path() {
            Some(_) => self.file_level.unwrap_or(self.console_level).max(self.console_level),
            None => self.console_level,
        }
    }
}

/// Console and file sinks with their own levels
pub struct ShotnessLogger {
    format: LogFormat,
    console: Option<LevelFilter>,
    file: Option<(LevelFilter, Mutex<File>)>,
}

impl ShotnessLogger {
    /// Build the sinks, opening the log file up front when one is configured
    pub fn new(config: LogConfig) -> Result<Self> {
        let console = config.destination.includes_console().then_some(config.console_level);

        let file_level = config.file_level.unwrap_or(config.console_level);
        let file = match config.destination.file_path() {
            Some(path) => {
                let handle = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .with_context(|| format!("Failed to open log file: {}", path.display()))?;
                Some((file_level, Mutex::new(handle)))
            }
            None => None,
        };

        Ok(Self {
            format: config.format,
            console,
            file,
        })
    }

    fn format_timestamp() -> String {
        Local::now().format(TIMESTAMP_FORMAT).to_string()
    }

    fn format_text_message(&self, level: Level, message: &str) -> String {
        format!("{} [{}] {}", Self::format_timestamp(), level, message)
    }

    fn format_json_message(&self, level: Level, target: &str, message: &str) -> Result<String> {
        let entry = JsonLogEntry {
            timestamp: Self::format_timestamp(),
            level: level.to_string(),
            message: message.to_owned(),
            target: (level >= Level::Debug).then(|| target.to_owned()),
        };
        serde_json::to_string(&entry).context("Failed to encode log entry as JSON")
    }

    fn render(&self, record: &Record<'_>) -> String {
        let message = record.args().to_string();
        match self.format {
            LogFormat::Text => self.format_text_message(record.level(), &message),
            LogFormat::Json => self
                .format_json_message(record.level(), record.target(), &message)
                .unwrap_or_else(|e| {
                    eprintln!("{}; writing the record as text", e);
                    self.format_text_message(record.level(), &message)
                }),
        }
    }

    fn should_log_to_console(&self, level: Level) -> bool {
        self.console.is_some_and(|max| level <= max)
    }

    fn should_log_to_file(&self, level: Level) -> bool {
        self.file.as_ref().is_some_and(|(max, _)| level <= *max)
    }

    fn write_to_console(&self, line: &str) {
        let _ = writeln!(io::stderr().lock(), "{}", line);
    }

    fn write_to_file(&self, line: &str) -> Result<()> {
        let Some((_, file)) = &self.file else {
            return Ok(());
        };
        let mut file = file.lock().map_err(|_| anyhow::anyhow!("Log file lock poisoned"))?;
        writeln!(file, "{}", line).context("Failed to append to log file")
    }
}

impl Log for ShotnessLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        self.should_log_to_console(metadata.level()) || self.should_log_to_file(metadata.level())
    }

    fn log(&self, record: &Record<'_>) {
        let level = record.level();
        let to_console = self.should_log_to_console(level);
        let to_file = self.should_log_to_file(level);
        if !(to_console || to_file) {
            return;
        }

        let line = self.render(record);
        if to_console {
            self.write_to_console(&line);
        }
        if to_file {
            if let Err(e) = self.write_to_file(&line) {
                eprintln!("{}; logging to stderr instead", e);
                if !to_console {
                    self.write_to_console(&line);
                }
            }
        }
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
        if let Some(Ok(mut file)) = self.file.as_ref().map(|(_, file)| file.lock()) {
            let _ = file.flush();
        }
    }
}

/// Install the global logger
pub fn init_logger(config: LogConfig) -> Result<()> {
    let max_level = config.max_level();
    let logger = ShotnessLogger::new(config)?;

    log::set_boxed_logger(Box::new(logger)).context("A global logger is already installed")?;
    log::set_max_level(max_level);
    Ok(())
}

/// Parse `error`, `warn`, `info`, `debug`, `trace` or `off` (any case)
pub fn parse_log_level(level_str: &str) -> Result<LevelFilter> {
    LevelFilter::from_str(level_str.trim()).map_err(|_| {
        anyhow::anyhow!(
            "Invalid log level '{}'. Valid levels: error, warn, info, debug, trace, off",
            level_str
        )
    })
}
