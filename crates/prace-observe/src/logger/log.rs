use std::io;

use time::{UtcOffset, format_description::well_known::Rfc3339};
use tracing_subscriber::{
    EnvFilter, Layer, Registry, fmt, fmt::time::OffsetTime, layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::logger::{config::LoggerConfig, error::LoggerError, format::LoggerFormat};

type Output = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Build the subscriber for `cfg` and make it the global default.
pub(crate) fn install(cfg: &LoggerConfig) -> Result<(), LoggerError> {
    let filter = filter(&cfg.level)?;
    let output = match cfg.format {
        LoggerFormat::Text => fmt::layer()
            .with_writer(io::stderr)
            .with_ansi(cfg.use_color)
            .with_target(cfg.with_targets)
            .with_timer(local_rfc3339())
            .boxed(),
        LoggerFormat::Json => fmt::layer()
            .json()
            .with_writer(io::stderr)
            .with_ansi(false)
            .with_target(cfg.with_targets)
            .with_timer(local_rfc3339())
            .boxed(),
        LoggerFormat::Journald => journald()?,
    };

    tracing_subscriber::registry()
        .with(output)
        .with(filter)
        .try_init()
        .map_err(|e| {
            let msg = e.to_string();
            if msg.contains("global default") || msg.contains("SetGlobalDefaultError") {
                LoggerError::AlreadyInitialized
            } else {
                LoggerError::InitializationFailed(msg)
            }
        })
}

fn filter(level: &str) -> Result<EnvFilter, LoggerError> {
    EnvFilter::try_new(level).map_err(|e| LoggerError::InvalidLogLevel {
        filter: level.to_string(),
        reason: e.to_string(),
    })
}

// Falls back to UTC when the local offset cannot be determined (e.g. multi-threaded start).
fn local_rfc3339() -> OffsetTime<Rfc3339> {
    OffsetTime::new(UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC), Rfc3339)
}

#[cfg(all(target_os = "linux", feature = "journald"))]
fn journald() -> Result<Output, LoggerError> {
    tracing_journald::layer()
        .map(|layer| layer.boxed())
        .map_err(|e| LoggerError::InitializationFailed(format!("journald: {e}")))
}

#[cfg(not(all(target_os = "linux", feature = "journald")))]
fn journald() -> Result<Output, LoggerError> {
    Err(LoggerError::JournaldNotSupported)
}
