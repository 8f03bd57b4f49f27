//! Tracing setup: stderr plus a daily-rolling file under the data dir.

use std::env;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

const LOG_FILE_PREFIX: &str = "adguard.log";

fn log_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|dir| dir.join("adguard").join("logs"))
}

fn env_filter() -> EnvFilter {
    let debug_enabled = env::var("ADGUARD_DEBUG_LOG")
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false);
    if debug_enabled {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// Keep the returned guard alive for the life of the process; dropping it
/// flushes and stops the file writer.
pub fn init() -> Option<WorkerGuard> {
    let Some(dir) = log_dir().filter(|dir| std::fs::create_dir_all(dir).is_ok()) else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter())
            .with_writer(std::io::stderr)
            .init();
        return None;
    };

    let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
    let (file_writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr.and(file_writer))
        .with_ansi(false)
        .init();
    Some(guard)
}
