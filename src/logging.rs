use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::{LogFormat, LogRotation, LoggingConfig};

/// Log file name prefix inside `log_dir`
const LOG_FILE_PREFIX: &str = "audit-scorer.log";

/// Install the global tracing subscriber
///
/// `RUST_LOG` takes precedence over the configured level. The returned guard
/// flushes the file writer and must be held until shutdown.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let env_filter = build_filter(&config.level);

    let console = match config.format {
        LogFormat::Pretty => fmt::layer().with_target(true).boxed(),
        LogFormat::Json => fmt::layer().json().with_current_span(false).boxed(),
    };

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            ensure_log_dir(dir)?;
            let appender = match config.rotation {
                LogRotation::Daily => rolling::daily(dir, LOG_FILE_PREFIX),
                LogRotation::Hourly => rolling::hourly(dir, LOG_FILE_PREFIX),
                LogRotation::Never => rolling::never(dir, LOG_FILE_PREFIX),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .json()
                .with_writer(writer)
                .with_ansi(false)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::info!("📝 Logging initialised (level: {})", config.level);
    if let Some(dir) = &config.log_dir {
        tracing::info!("📂 Log directory: {}", dir.display());
    }

    Ok(guard)
}

fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Create the log directory when missing
fn ensure_log_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_log_dir_creates_nested() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("logs").join("scorer");
        ensure_log_dir(&dir).unwrap();
        assert!(dir.is_dir());
    }

    #[test]
    fn test_invalid_level_falls_back() {
        // must not panic on a malformed directive
        let _ = build_filter("not a [valid directive");
    }
}
