// Configuration types module
// Defines all configuration-related data structures

use serde::Deserialize;
use std::path::PathBuf;

use crate::download::{BufferPolicy, ResourceKind};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub system: SystemConfig,
    #[serde(default)]
    pub token: TokenConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    #[serde(default)]
    pub download: DownloadConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

/// On-disk layout of the node
#[derive(Debug, Deserialize, Clone)]
pub struct SystemConfig {
    /// Parent of every server's volume directory
    pub data_dir: PathBuf,
    /// Directory holding local backup archives
    pub backup_dir: PathBuf,
}

/// Download token verification
#[derive(Deserialize, Clone, Default)]
pub struct TokenConfig {
    /// Shared HS256 secret
    #[serde(default)]
    pub secret: String,
}

impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Log file path (optional, stdout if not set)
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive: bool,
    /// Seconds a client gets to send request headers
    pub header_read_timeout: u64,
    pub max_connections: Option<u64>,
    /// Seconds to wait for active connections on shutdown
    pub shutdown_grace_period: u64,
}

/// Buffer tables used when streaming downloads
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct DownloadConfig {
    #[serde(default = "default_file_buffers")]
    pub file_buffers: BufferPolicy,
    #[serde(default = "default_backup_buffers")]
    pub backup_buffers: BufferPolicy,
}

fn default_file_buffers() -> BufferPolicy {
    BufferPolicy::for_kind(ResourceKind::File)
}

fn default_backup_buffers() -> BufferPolicy {
    BufferPolicy::for_kind(ResourceKind::Backup)
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            file_buffers: default_file_buffers(),
            backup_buffers: default_backup_buffers(),
        }
    }
}

impl DownloadConfig {
    pub const fn policy_for(&self, kind: ResourceKind) -> &BufferPolicy {
        match kind {
            ResourceKind::File => &self.file_buffers,
            ResourceKind::Backup => &self.backup_buffers,
        }
    }
}
