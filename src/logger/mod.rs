//! Logger module
//!
//! Provides logging utilities for the download server including:
//! - Subscriber setup from the logging configuration
//! - Server lifecycle logging
//! - Access logging with multiple formats

mod format;
mod writer;

pub use format::AccessLogEntry;

use std::io;
use std::net::SocketAddr;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

use crate::config::{Config, LoggingConfig};

/// Target used for access log lines
pub const ACCESS_TARGET: &str = "access";

/// Install the global `tracing` subscriber
///
/// `RUST_LOG` takes precedence over `logging.level`. Should be called once
/// at application startup.
pub fn init(config: &LoggingConfig) -> io::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let result = match &config.log_file {
        Some(path) => {
            let file = writer::open_log_file(path)?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => builder.try_init(),
    };
    result.map_err(io::Error::other)
}

pub fn log_server_start(addr: &SocketAddr, config: &Config) {
    tracing::info!("======================================");
    tracing::info!("Download server started successfully");
    tracing::info!("Listening on: http://{addr}");
    tracing::info!("Log level: {}", config.logging.level);
    if let Some(workers) = config.server.workers {
        tracing::info!("Worker threads: {workers}");
    }
    if let Some(max) = config.performance.max_connections {
        tracing::info!("Max connections: {max}");
    }
    tracing::info!("Volumes: {}", config.system.data_dir.display());
    tracing::info!("Backups: {}", config.system.backup_dir.display());
    if let Some(ref path) = config.logging.log_file {
        tracing::info!("Log file: {}", path.display());
    }
    tracing::info!("======================================");
}

pub fn log_connection_error(peer: &SocketAddr, err: &impl std::fmt::Display) {
    tracing::debug!(%peer, "failed to serve connection: {err}");
}

pub fn log_shutdown_started(active: usize) {
    tracing::info!("[Shutdown] Stopped accepting connections, {active} still active");
}

pub fn log_shutdown_complete(remaining: usize) {
    if remaining == 0 {
        tracing::info!("[Shutdown] All connections closed");
    } else {
        tracing::warn!("[Shutdown] Grace period elapsed with {remaining} connections still open");
    }
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    tracing::info!(target: ACCESS_TARGET, "{}", entry.format(format));
}
