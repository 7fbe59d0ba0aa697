//! Logging setup for bizlog.
//!
//! Installs a `tracing-subscriber` registry with an `EnvFilter` and one
//! fmt layer per output, in the format chosen by [`LogConfig`].

use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan, MakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

/// Convenience macros re-exported from tracing.
pub use tracing::{debug, error, info, trace, warn};

/// Span helpers for intercepted calls.
pub mod spans;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Logging configuration.
#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    /// Minimum log level.
    pub level: LogLevel,
    /// Output format.
    pub format: LogFormat,
    /// Also append to this file.
    pub file_path: Option<PathBuf>,
    /// Include source file and line.
    pub source_location: bool,
    /// Emit span open/close events.
    pub span_events: bool,
}

/// Log level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for tracing_subscriber::filter::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing_subscriber::filter::LevelFilter::TRACE,
            LogLevel::Debug => tracing_subscriber::filter::LevelFilter::DEBUG,
            LogLevel::Info => tracing_subscriber::filter::LevelFilter::INFO,
            LogLevel::Warn => tracing_subscriber::filter::LevelFilter::WARN,
            LogLevel::Error => tracing_subscriber::filter::LevelFilter::ERROR,
        }
    }
}

impl LogLevel {
    /// Parse from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Some(Self::Trace),
            "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" | "warning" => Some(Self::Warn),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    /// Directive string for `EnvFilter`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable multi-field format.
    #[default]
    Pretty,
    /// Compact single-line format.
    Compact,
    /// JSON structured format.
    Json,
}

impl LogFormat {
    /// Parse from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Some(Self::Pretty),
            "compact" => Some(Self::Compact),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

impl LogConfig {
    /// Create config from environment variables.
    ///
    /// `BIZLOG_LOG_LEVEL` (falling back to `RUST_LOG`), `BIZLOG_LOG_FORMAT`,
    /// `BIZLOG_LOG_FILE`, `BIZLOG_LOG_SOURCE` and `BIZLOG_LOG_SPANS`.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        let level = std::env::var("BIZLOG_LOG_LEVEL").or_else(|_| std::env::var("RUST_LOG"));
        if let Some(l) = level.ok().as_deref().and_then(LogLevel::parse) {
            config.level = l;
        }

        if let Some(f) = std::env::var("BIZLOG_LOG_FORMAT")
            .ok()
            .as_deref()
            .and_then(LogFormat::parse)
        {
            config.format = f;
        }

        if let Ok(file_path) = std::env::var("BIZLOG_LOG_FILE") {
            config.file_path = Some(PathBuf::from(file_path));
        }

        config.source_location = env_flag("BIZLOG_LOG_SOURCE");
        config.span_events = env_flag("BIZLOG_LOG_SPANS");

        config
    }

    /// Create config from the string values of a config file.
    ///
    /// Unrecognised values keep the defaults.
    pub fn from_settings(level: &str, format: &str, file_path: Option<PathBuf>) -> Self {
        Self {
            level: LogLevel::parse(level).unwrap_or_default(),
            format: LogFormat::parse(format).unwrap_or_default(),
            file_path,
            ..Self::default()
        }
    }

    fn fmt_span(&self) -> FmtSpan {
        if self.span_events {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        }
    }

    fn layer<W>(&self, writer: W, ansi: bool) -> BoxedLayer
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        let base = fmt::layer()
            .with_writer(writer)
            .with_ansi(ansi)
            .with_target(true)
            .with_file(self.source_location)
            .with_line_number(self.source_location)
            .with_span_events(self.fmt_span());

        match self.format {
            LogFormat::Pretty => base.boxed(),
            LogFormat::Compact => base.compact().boxed(),
            LogFormat::Json => base.json().boxed(),
        }
    }
}

fn env_flag(var: &str) -> bool {
    std::env::var(var)
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
        .unwrap_or(false)
}

/// Initialize logging with the given configuration.
///
/// `RUST_LOG` directives take precedence over `config.level`.
pub fn init(config: LogConfig) -> Result<(), LogError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));

    let mut layers: Vec<BoxedLayer> = vec![config.layer(io::stdout, true)];

    if let Some(file_path) = &config.file_path {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(file_path)?;
        layers.push(config.layer(Mutex::new(file), false));
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| LogError::InitError(e.to_string()))
}

/// Logging errors.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("failed to initialize logging: {0}")]
    InitError(String),

    #[error("failed to open log file: {0}")]
    FileError(#[from] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_log_level_parse() {
        assert_eq!(LogLevel::parse("info"), Some(LogLevel::Info));
        assert_eq!(LogLevel::parse("DEBUG"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::parse("Warning"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse(" error "), Some(LogLevel::Error));
        assert_eq!(LogLevel::parse("trace"), Some(LogLevel::Trace));
        assert_eq!(LogLevel::parse("bizlog=debug"), None);
    }

    #[test]
    fn test_log_level_from() {
        use tracing_subscriber::filter::LevelFilter;
        assert_eq!(LevelFilter::from(LogLevel::Trace), LevelFilter::TRACE);
        assert_eq!(LevelFilter::from(LogLevel::Info), LevelFilter::INFO);
        assert_eq!(LevelFilter::from(LogLevel::Error), LevelFilter::ERROR);
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("json"), Some(LogFormat::Json));
        assert_eq!(LogFormat::parse("Compact"), Some(LogFormat::Compact));
        assert_eq!(LogFormat::parse("pretty"), Some(LogFormat::Pretty));
        assert_eq!(LogFormat::parse("xml"), None);
    }

    #[test]
    fn test_from_settings_keeps_defaults_for_unknown_values() {
        let config = LogConfig::from_settings("warn", "json", None);
        assert_eq!(config.level, LogLevel::Warn);
        assert_eq!(config.format, LogFormat::Json);

        let config = LogConfig::from_settings("loud", "xml", Some(PathBuf::from("/tmp/b.log")));
        assert_eq!(config.level, LogLevel::Info);
        assert_eq!(config.format, LogFormat::Pretty);
        assert_eq!(config.file_path, Some(PathBuf::from("/tmp/b.log")));
    }

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert_eq!(config.level, LogLevel::Info);
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(config.file_path.is_none());
        assert!(!config.source_location);
        assert!(!config.span_events);
    }

    // Both env-driven cases share one test so they never race on RUST_LOG.
    #[test]
    fn test_config_from_env() {
        let saved: Vec<(&str, Option<String>)> = [
            "BIZLOG_LOG_LEVEL",
            "BIZLOG_LOG_FORMAT",
            "BIZLOG_LOG_FILE",
            "BIZLOG_LOG_SOURCE",
            "BIZLOG_LOG_SPANS",
            "RUST_LOG",
        ]
        .into_iter()
        .map(|k| (k, env::var(k).ok()))
        .collect();

        env::set_var("BIZLOG_LOG_LEVEL", "debug");
        env::set_var("BIZLOG_LOG_FORMAT", "json");
        env::set_var("BIZLOG_LOG_FILE", "/tmp/bizlog-test.log");
        env::set_var("BIZLOG_LOG_SOURCE", "true");
        env::set_var("BIZLOG_LOG_SPANS", "1");

        let config = LogConfig::from_env();
        assert_eq!(config.level, LogLevel::Debug);
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.file_path, Some(PathBuf::from("/tmp/bizlog-test.log")));
        assert!(config.source_location);
        assert!(config.span_events);

        env::remove_var("BIZLOG_LOG_LEVEL");
        env::set_var("RUST_LOG", "warn");
        assert_eq!(LogConfig::from_env().level, LogLevel::Warn);

        for (key, value) in saved {
            match value {
                Some(v) => env::set_var(key, v),
                None => env::remove_var(key),
            }
        }
    }
}
