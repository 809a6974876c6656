use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;

const LOG_FILE_PREFIX: &str = "key-lease-server.log";

/// Keeps the non-blocking file writer flushing until dropped.
pub struct FileLogGuard {
    _guard: WorkerGuard,
}

/// Installs the global subscriber: stdout always, plus a daily rolling file
/// under `config.log_dir` when set.
pub fn init_tracing(config: &Config) -> Option<FileLogGuard> {
    let env_filter = build_filter(&config.log_level);
    let stdout_layer = fmt::layer().with_target(true);

    let file = config.log_dir.as_deref().and_then(|dir| match std::fs::create_dir_all(dir) {
        Ok(()) => Some(tracing_appender::non_blocking(RollingFileAppender::new(
            Rotation::DAILY,
            dir,
            LOG_FILE_PREFIX,
        ))),
        Err(err) => {
            eprintln!("failed to create log directory {dir}: {err}");
            None
        }
    });

    match file {
        Some((file_writer, guard)) => {
            let file_layer = fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_target(true);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(stdout_layer)
                .with(file_layer)
                .init();

            Some(FileLogGuard { _guard: guard })
        }
        None => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(stdout_layer)
                .init();

            None
        }
    }
}

/// One summary line of how the process is wired, emitted after the store
/// is selected.
pub fn log_startup(config: &Config, backend: &str) {
    tracing::info!(
        backend,
        reclaimer = config.reclaimer_enabled,
        log_dir = config.log_dir.as_deref().unwrap_or("-"),
        log_level = %config.log_level,
        "key-lease-server configured"
    );

    if backend == "memory" {
        tracing::warn!("REDIS_URL not set, keys are kept in process memory and lost on restart");
    }
    if !config.reclaimer_enabled {
        tracing::warn!("ENABLE_RECLAIMER is off, expired keys and timed-out leases stay until deleted");
    }
}

/// Falls back to `info` when `RUST_LOG` does not parse. The redis client
/// is capped at `warn` unless a directive names it.
fn build_filter(log_level: &str) -> EnvFilter {
    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    if log_level.contains("redis") {
        return filter;
    }
    match "redis=warn".parse() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    }
}
