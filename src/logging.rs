//! Tracing setup.
//!
//! Two daily-rotated files under the log directory: `mcp-all.<date>.log` with
//! every enabled level and `mcp-error.<date>.log` with errors only. Output is
//! mirrored to stderr when verbose; stdout belongs to the transport.
//!
//! Rotation is by day only. `tracing-appender` has no size trigger, so
//! `LOG_ROTATE_MAX_BYTES` is not read.

use std::path::PathBuf;

use tracing::{Level, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::SpellbookError;

pub const DEFAULT_FILTER: &str = "spellbook=debug";

/// Pruning matches on prefix, so neither may be a prefix of the other.
pub const ALL_PREFIX: &str = "mcp-all";
pub const ERROR_PREFIX: &str = "mcp-error";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub dir: PathBuf,
    pub verbose: bool,
    /// Rotated files kept per sink.
    pub backups: usize,
}

/// Keeps the background file writers alive; drop it last.
#[must_use = "dropping the guards stops file logging"]
pub struct LogGuards {
    _guards: Vec<WorkerGuard>,
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

fn appender(config: &LogConfig, prefix: &str) -> Result<RollingFileAppender, SpellbookError> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .filename_suffix("log")
        .max_log_files(config.backups.max(1))
        .build(&config.dir)
        .map_err(|e| SpellbookError::Logging {
            message: format!("{}: {e}", config.dir.display()),
        })
}

fn try_init(config: &LogConfig) -> Result<LogGuards, SpellbookError> {
    std::fs::create_dir_all(&config.dir).map_err(|e| SpellbookError::Logging {
        message: format!("{}: {e}", config.dir.display()),
    })?;
    let (all, all_guard) = tracing_appender::non_blocking(appender(config, ALL_PREFIX)?);
    let (errors, error_guard) = tracing_appender::non_blocking(appender(config, ERROR_PREFIX)?);

    let console = config
        .verbose
        .then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(env_filter())
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(all),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(errors.with_max_level(Level::ERROR)),
        )
        .with(console)
        .try_init()
        .map_err(|e| SpellbookError::Logging {
            message: e.to_string(),
        })?;

    Ok(LogGuards {
        _guards: vec![all_guard, error_guard],
    })
}

/// Install the global subscriber.
///
/// If the file sinks cannot be set up, logging degrades to stderr only and
/// startup continues.
pub fn init(config: &LogConfig) -> LogGuards {
    match try_init(config) {
        Ok(guards) => guards,
        Err(e) => {
            let _ = tracing_subscriber::registry()
                .with(env_filter())
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .try_init();
            warn!(error = %e, "file logging unavailable, logging to stderr");
            LogGuards {
                _guards: Vec::new(),
            }
        }
    }
}
