//! Console and rolling-file logging for the relay process

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{RelayError, Result};

const LOG_FILE_PREFIX: &str = "rich-presence-relay.log";
const DEFAULT_FILTER: &str = "info,discord_sdk=warn";
const DEFAULT_KEEP_DAYS: u64 = 7;

pub const LOG_DIR_VAR: &str = "RICH_PRESENCE_LOG_DIR";
pub const KEEP_DAYS_VAR: &str = "RICH_PRESENCE_LOG_KEEP_DAYS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Falls back to the per-user data directory when unset
    pub log_dir: Option<PathBuf>,
    /// Used when `RUST_LOG` is absent or unparsable
    pub default_filter: String,
    pub keep_days: u64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: None,
            default_filter: DEFAULT_FILTER.to_string(),
            keep_days: DEFAULT_KEEP_DAYS,
        }
    }
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(dir) = lookup(LOG_DIR_VAR).filter(|d| !d.is_empty()) {
            config.log_dir = Some(PathBuf::from(dir));
        }
        if let Some(days) = lookup(KEEP_DAYS_VAR).and_then(|d| d.parse().ok()) {
            config.keep_days = days;
        }

        config
    }

    fn resolve_log_dir(&self) -> Result<PathBuf> {
        let log_dir = match &self.log_dir {
            Some(dir) => dir.clone(),
            None => dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("rich-presence-relay")
                .join("logs"),
        };

        fs::create_dir_all(&log_dir).map_err(|e| {
            RelayError::Logging(format!(
                "Failed to create log directory {}: {}",
                log_dir.display(),
                e
            ))
        })?;

        Ok(log_dir)
    }
}

/// Install the global subscriber. Keep the guard alive until exit or buffered
/// file output is lost.
pub fn init_logging(config: &LoggingConfig) -> Result<WorkerGuard> {
    let log_dir = config.resolve_log_dir()?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, LOG_FILE_PREFIX);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    // stdout is reserved for the host process, so the console gets stderr
    let console_layer = fmt::layer()
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr);

    let file_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false)
        .with_writer(file_writer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| RelayError::Logging(e.to_string()))?;

    tracing::info!("Logging to {}", log_dir.display());
    tracing::info!("Rich presence relay version: {}", env!("CARGO_PKG_VERSION"));

    let removed = cleanup_old_logs(&log_dir, config.keep_days);
    if removed > 0 {
        tracing::debug!("Removed {} expired log files", removed);
    }

    Ok(guard)
}

/// Daily rotation appends the date to the prefix; the bare prefix is never ours to delete
fn is_rotated_log(name: &str) -> bool {
    name.strip_prefix(LOG_FILE_PREFIX)
        .is_some_and(|suffix| suffix.starts_with('.'))
}

/// Remove rotated log files last modified more than `keep_days` ago
fn cleanup_old_logs(log_dir: &Path, keep_days: u64) -> usize {
    let Some(cutoff) =
        SystemTime::now().checked_sub(Duration::from_secs(keep_days.saturating_mul(86_400)))
    else {
        return 0;
    };

    let entries = match fs::read_dir(log_dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("Failed to read log directory for cleanup: {}", e);
            return 0;
        }
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        let rotated = entry.file_name().to_str().is_some_and(is_rotated_log);
        if !rotated {
            continue;
        }

        let expired = entry
            .metadata()
            .and_then(|m| m.modified())
            .is_ok_and(|modified| modified < cutoff);
        if !expired {
            continue;
        }

        match fs::remove_file(entry.path()) {
            Ok(()) => removed += 1,
            Err(e) => tracing::warn!("Failed to remove {:?}: {}", entry.path(), e),
        }
    }

    removed
}
