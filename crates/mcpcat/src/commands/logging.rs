//! Logging initialization.
//!
//! Logs go to stderr so `--json` output on stdout stays machine-readable.

use mcpcat_core::Config;
use mcpcat_util::log::{LogConfig, LogLevel};
use std::io::IsTerminal;

/// Initialize logging from the `--verbose` flag and the loaded config.
pub fn init_logging(verbose: bool, config: &Config) {
    let level = if verbose {
        LogLevel::Debug
    } else {
        config.log_level()
    };

    mcpcat_util::log::init(LogConfig {
        level,
        ansi: std::io::stderr().is_terminal(),
        include_location: level == LogLevel::Trace,
        ..Default::default()
    });
}
