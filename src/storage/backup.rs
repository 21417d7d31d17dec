//! Local backup archives

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs::File;
use uuid::Uuid;

use super::ServerRegistry;
use crate::download::{LocateError, OpenResource, ResourceKind, ResourceMetadata, ResourceProvider};
use crate::token::{DownloadClaims, ResourceRef};

const ARCHIVE_EXTENSION: &str = "tar.gz";

/// Backups stored as `<backup_dir>/<backup_uuid>.tar.gz`
pub struct LocalBackupStore {
    backup_dir: PathBuf,
    registry: Arc<dyn ServerRegistry>,
}

impl LocalBackupStore {
    pub fn new(backup_dir: impl Into<PathBuf>, registry: Arc<dyn ServerRegistry>) -> Self {
        Self {
            backup_dir: backup_dir.into(),
            registry,
        }
    }

    /// Archive path for a backup
    pub fn archive_path(&self, backup_uuid: Uuid) -> PathBuf {
        self.backup_dir
            .join(format!("{backup_uuid}.{ARCHIVE_EXTENSION}"))
    }
}

#[async_trait]
impl ResourceProvider for LocalBackupStore {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Backup
    }

    async fn open(&self, claims: &DownloadClaims) -> Result<OpenResource, LocateError> {
        let ResourceRef::Backup(backup_uuid) = claims.resource else {
            return Err(LocateError::NotFound);
        };
        if self.registry.root_for(claims.server_uuid).await.is_none() {
            tracing::debug!(server = %claims.server_uuid, "backup requested for unknown server");
            return Err(LocateError::NotFound);
        }

        let path = self.archive_path(backup_uuid);
        let file = File::open(&path).await?;
        let metadata = file.metadata().await?;
        let name = format!("{backup_uuid}.{ARCHIVE_EXTENSION}");

        Ok(OpenResource::new(file, ResourceMetadata::from_fs(name, &metadata)))
    }
}
