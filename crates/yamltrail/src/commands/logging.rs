//! Logging initialization for the CLI.
//!
//! Logs go to stderr so that command output on stdout stays parseable.

use std::io::IsTerminal;
use yamltrail_util::{LogConfig, LogLevel};

/// Initialize logging from the verbosity flag and the configured level.
///
/// `--verbose` wins over the config file; `RUST_LOG` wins over both.
pub fn init_logging(verbose: bool, configured: Option<LogLevel>) {
    let level = if verbose {
        LogLevel::Debug
    } else {
        configured.unwrap_or(LogLevel::Warn)
    };

    yamltrail_util::log::init(LogConfig {
        level,
        include_location: verbose,
        ansi: std::io::stderr().is_terminal(),
    });
}
