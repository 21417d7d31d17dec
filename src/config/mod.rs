// Configuration module entry point
// Layers the config file, SERVER_* environment variables and defaults

mod state;
mod types;

use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

pub use state::AppState;
pub use types::{
    Config, DownloadConfig, LoggingConfig, PerformanceConfig, ServerConfig, SystemConfig,
    TokenConfig,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Load(#[from] config::ConfigError),
    #[error("invalid listen address: {0}")]
    Address(#[from] std::net::AddrParseError),
    #[error("token.secret must be set")]
    MissingSecret,
}

impl Config {
    /// Load configuration from specified file path (without extension)
    pub fn load_from(config_path: &str) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("SERVER")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("system.data_dir", "/var/lib/node/volumes")?
            .set_default("system.backup_dir", "/var/lib/node/backups")?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("performance.keep_alive", true)?
            .set_default("performance.header_read_timeout", 30)?
            .set_default("performance.shutdown_grace_period", 10)?
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the daemon cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token.secret.trim().is_empty() {
            return Err(ConfigError::MissingSecret);
        }
        Ok(())
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        Ok(format!("{}:{}", self.server.host, self.server.port).parse()?)
    }
}

#[cfg(test)]
impl Config {
    pub const TEST_SECRET: &'static str = "test-secret";

    /// Configuration rooted in a scratch directory
    pub fn for_tests(root: &std::path::Path) -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                workers: None,
            },
            system: SystemConfig {
                data_dir: root.join("volumes"),
                backup_dir: root.join("backups"),
            },
            token: TokenConfig {
                secret: Self::TEST_SECRET.to_string(),
            },
            logging: LoggingConfig {
                level: "debug".to_string(),
                access_log: true,
                access_log_format: "combined".to_string(),
                log_file: None,
            },
            performance: PerformanceConfig {
                keep_alive: true,
                header_read_timeout: 30,
                max_connections: None,
                shutdown_grace_period: 1,
            },
            download: DownloadConfig::default(),
        }
    }
}

impl PerformanceConfig {
    pub const fn header_read_timeout(&self) -> Duration {
        Duration::from_secs(self.header_read_timeout)
    }

    pub const fn shutdown_grace_period(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::{BufferThreshold, ResourceKind};

    fn write_config(contents: &str) -> (tempfile::TempDir, String) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("node.toml");
        std::fs::write(&path, contents).unwrap();
        let path = path.to_string_lossy().into_owned();
        (dir, path)
    }

    #[test]
    fn test_defaults_apply() {
        let (_dir, path) = write_config("[token]\nsecret = \"s3cret\"\n");
        let config = Config::load_from(&path).unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.system.backup_dir.to_str(), Some("/var/lib/node/backups"));
        assert_eq!(config.logging.access_log_format, "combined");
        assert!(config.performance.keep_alive);
        assert_eq!(config.performance.header_read_timeout().as_secs(), 30);
        assert_eq!(config.performance.shutdown_grace_period().as_secs(), 10);
        assert_eq!(config.download, DownloadConfig::default());
        assert_eq!(
            config.get_socket_addr().unwrap(),
            "127.0.0.1:8080".parse::<SocketAddr>().unwrap()
        );
    }

    #[test]
    fn test_missing_secret_is_rejected() {
        let (_dir, path) = write_config("[server]\nport = 9000\n");
        assert!(matches!(Config::load_from(&path), Err(ConfigError::MissingSecret)));

        let (_dir, path) = write_config("[token]\nsecret = \"  \"\n");
        assert!(matches!(Config::load_from(&path), Err(ConfigError::MissingSecret)));
    }

    #[test]
    fn test_buffer_tables_are_configurable() {
        let (_dir, path) = write_config(
            r#"
[token]
secret = "s3cret"

[download.file_buffers]
default_buffer = 8192
thresholds = [
    { above = 1048576, buffer = 131072 },
    { above = 1024, buffer = 16384 },
]
"#,
        );
        let config = Config::load_from(&path).unwrap();
        let files = config.download.policy_for(ResourceKind::File);

        assert_eq!(files.default_buffer, 8192);
        assert_eq!(
            files.thresholds[0],
            BufferThreshold { above: 1_048_576, buffer: 131_072 }
        );
        assert_eq!(files.buffer_size_for(100), 8192);
        assert_eq!(files.buffer_size_for(2048), 16384);
        assert_eq!(files.buffer_size_for(2_000_000), 131_072);

        // The other kind keeps its built-in table
        assert_eq!(
            config.download.policy_for(ResourceKind::Backup),
            &crate::download::BufferPolicy::for_kind(ResourceKind::Backup)
        );
    }

    #[test]
    fn test_invalid_address() {
        let (_dir, path) = write_config("[server]\nhost = \"not an ip\"\n[token]\nsecret = \"x\"\n");
        let config = Config::load_from(&path).unwrap();
        assert!(matches!(config.get_socket_addr(), Err(ConfigError::Address(_))));
    }

    #[test]
    fn test_secret_is_redacted() {
        let config = TokenConfig { secret: "hunter2".to_string() };
        assert!(!format!("{config:?}").contains("hunter2"));
    }
}
