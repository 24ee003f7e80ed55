use color_eyre::{eyre::eyre, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_LEVEL: &str = "info";

/// Route tracing output to a daily rolling file under `dir`.
///
/// The terminal belongs to the TUI, so nothing is written to stdout/stderr.
/// Keep the returned guard alive until exit or buffered lines are lost.
pub fn init(dir: &Path, level: Option<&str>) -> Result<WorkerGuard> {
  std::fs::create_dir_all(dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;

  let appender = tracing_appender::rolling::daily(dir, "crmdeck.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  let file_layer = fmt::layer()
    .with_writer(writer)
    .with_ansi(false)
    .with_target(true);

  tracing_subscriber::registry()
    .with(filter(level))
    .with(file_layer)
    .try_init()
    .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;

  tracing::info!(dir = %dir.display(), "logging initialized");
  Ok(guard)
}

fn filter(level: Option<&str>) -> EnvFilter {
  let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
  filter_from(env.as_deref(), level)
}

/// RUST_LOG first, then the configured level, then "info".
fn filter_from(env: Option<&str>, level: Option<&str>) -> EnvFilter {
  env
    .ok_or(())
    .and_then(|directives| EnvFilter::try_new(directives).map_err(|_| ()))
    .or_else(|_| EnvFilter::try_new(level.unwrap_or(DEFAULT_LEVEL)))
    .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL))
}
