use thiserror::Error;

/// Errors raised while installing the race logger.
#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("unknown log format '{0}' (expected text, json or journald)")]
    InvalidFormat(String),
    #[error("journald output requested but not available in this build")]
    JournaldNotSupported,
    #[error("a global tracing subscriber is already installed")]
    AlreadyInitialized,
    #[error("logger initialization failed: {0}")]
    InitializationFailed(String),
    #[error("invalid log filter '{filter}': {reason}")]
    InvalidLogLevel { filter: String, reason: String },
}
