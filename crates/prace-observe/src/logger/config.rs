use std::io::IsTerminal;

use crate::logger::format::LoggerFormat;

/// Logger settings handed to [`crate::logger_init`].
///
/// `level` is an `EnvFilter` directive, so per-target filters such as
/// `"info,prace.exec=debug"` are accepted.
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub format: LoggerFormat,
    pub level: String,
    pub with_targets: bool,
    pub use_color: bool,
}

impl LoggerConfig {
    /// Default config with the level picked from a verbosity switch.
    pub fn verbose(verbose: bool) -> Self {
        Self {
            level: if verbose { "debug" } else { "info" }.to_string(),
            ..Self::default()
        }
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            format: LoggerFormat::Text,
            level: "info".to_string(),
            with_targets: true,
            use_color: std::io::stderr().is_terminal(),
        }
    }
}
