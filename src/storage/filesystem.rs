//! Server volume files
//!
//! Paths in file tokens are relative to the server's root; anything that
//! resolves outside of it, symlinks included, is treated as missing.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::{self, File};
use uuid::Uuid;

use super::ServerRegistry;
use crate::download::{LocateError, OpenResource, ResourceKind, ResourceMetadata, ResourceProvider};
use crate::token::{DownloadClaims, ResourceRef};

pub struct ServerFilesystem {
    registry: Arc<dyn ServerRegistry>,
}

impl ServerFilesystem {
    pub fn new(registry: Arc<dyn ServerRegistry>) -> Self {
        Self { registry }
    }

    /// Resolve `path` inside the server root, following symlinks
    pub async fn resolve(&self, server_uuid: Uuid, path: &str) -> Result<PathBuf, LocateError> {
        let root = self
            .registry
            .root_for(server_uuid)
            .await
            .ok_or(LocateError::NotFound)?;
        let root = fs::canonicalize(&root).await?;

        let relative = path.trim_start_matches('/');
        let resolved = fs::canonicalize(root.join(relative)).await?;
        if !resolved.starts_with(&root) {
            tracing::warn!(
                server = %server_uuid,
                requested = path,
                resolved = %resolved.display(),
                "path traversal attempt blocked"
            );
            return Err(LocateError::NotFound);
        }
        Ok(resolved)
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[async_trait]
impl ResourceProvider for ServerFilesystem {
    fn kind(&self) -> ResourceKind {
        ResourceKind::File
    }

    async fn open(&self, claims: &DownloadClaims) -> Result<OpenResource, LocateError> {
        let ResourceRef::File(requested) = &claims.resource else {
            return Err(LocateError::NotFound);
        };

        let path = self.resolve(claims.server_uuid, requested).await?;
        let file = File::open(&path).await?;
        let metadata = file.metadata().await?;

        Ok(OpenResource::new(
            file,
            ResourceMetadata::from_fs(display_name(&path), &metadata),
        ))
    }
}
