//! Logging setup and configuration

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Console plus hourly-rolling file output. The returned guard flushes
/// the file writer on drop; `main` holds it for the process lifetime.
pub fn setup_logging() -> Result<WorkerGuard> {
    let file_appender = tracing_appender::rolling::hourly("output/logs", "liq-watch-bot.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_ansi(true);
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .compact();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .with(filter)
        .init();

    Ok(guard)
}

pub fn setup_output_directories() -> Result<()> {
    use std::fs;

    fs::create_dir_all("output/logs")?;
    fs::create_dir_all("output/alerts")?;
    fs::create_dir_all("output/liquidations")?;

    Ok(())
}
