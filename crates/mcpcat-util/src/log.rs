//! Logging setup.
//!
//! Library crates only emit `tracing` events. The binary installs the
//! subscriber once through [`init`], writing to stderr so stdout stays free
//! for command output.

use std::fmt;
use std::str::FromStr;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt as fmt_layer, prelude::*, EnvFilter};

/// Crates whose events follow the configured level. Everything else stays at `warn`.
const OWN_CRATES: &[&str] = &["mcpcat", "mcpcat_core", "mcpcat_mcp", "mcpcat_storage", "mcpcat_util"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    /// `EnvFilter` directive: dependencies at `warn`, our crates at this level.
    pub fn directive(&self) -> String {
        let level = self.as_str();
        let mut directive = String::from("warn");
        for krate in OWN_CRATES {
            directive.push_str(&format!(",{krate}={level}"));
        }
        directive
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level '{other}'")),
        }
    }
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Print events to stderr. When false, spans still work but events are dropped.
    pub print: bool,
    pub level: LogLevel,
    /// Include file and line in each event.
    pub include_location: bool,
    pub ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            print: true,
            level: LogLevel::Info,
            include_location: false,
            ansi: true,
        }
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over `config.level`. Returns false if a
/// subscriber was already installed.
pub fn init(config: LogConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.directive()));
    let registry = tracing_subscriber::registry().with(filter);

    let installed = if config.print {
        let layer = fmt_layer::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_ansi(config.ansi)
            .with_file(config.include_location)
            .with_line_number(config.include_location);
        registry.with(layer).try_init()
    } else {
        registry.try_init()
    };

    installed.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!("debug".parse::<LogLevel>(), Ok(LogLevel::Debug));
        assert_eq!(" WARNING ".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_levels_order_by_severity() {
        assert!(LogLevel::Trace < LogLevel::Debug);
        assert!(LogLevel::Warn < LogLevel::Error);
        assert_eq!(LevelFilter::from(LogLevel::Error), LevelFilter::ERROR);
    }

    #[test]
    fn test_directive_scopes_crates() {
        let directive = LogLevel::Debug.directive();
        assert!(directive.starts_with("warn,"));
        assert!(directive.contains("mcpcat_mcp=debug"));
        assert!(EnvFilter::try_new(&directive).is_ok());
    }

    #[test]
    fn test_second_init_is_refused() {
        let quiet = || LogConfig {
            print: false,
            ..Default::default()
        };
        init(quiet());
        assert!(!init(quiet()));
    }
}
