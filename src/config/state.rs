// Application state module
// Everything a request needs, built once from the configuration

use std::sync::Arc;

use super::types::Config;
use crate::download::{DownloadHandler, ResourceKind};
use crate::storage::{LocalBackupStore, ServerFilesystem, ServerRegistry, VolumeRegistry};
use crate::token::{JwtTokenValidator, TokenValidator};

/// Application state shared by every connection
pub struct AppState {
    pub config: Config,
    pub backups: DownloadHandler<LocalBackupStore>,
    pub files: DownloadHandler<ServerFilesystem>,
}

impl AppState {
    /// Wire the default token validator and on-disk stores
    pub fn new(config: &Config) -> Self {
        let tokens: Arc<dyn TokenValidator> = Arc::new(JwtTokenValidator::new(&config.token.secret));
        let registry: Arc<dyn ServerRegistry> =
            Arc::new(VolumeRegistry::new(&config.system.data_dir));

        let backups = DownloadHandler::new(
            LocalBackupStore::new(&config.system.backup_dir, Arc::clone(&registry)),
            Arc::clone(&tokens),
        )
        .with_buffer_policy(config.download.policy_for(ResourceKind::Backup).clone());

        let files = DownloadHandler::new(ServerFilesystem::new(registry), tokens)
            .with_buffer_policy(config.download.policy_for(ResourceKind::File).clone());

        Self {
            config: config.clone(),
            backups,
            files,
        }
    }

    pub const fn access_log(&self) -> bool {
        self.config.logging.access_log
    }
}
