//! Server registry

use async_trait::async_trait;
use std::path::PathBuf;
use uuid::Uuid;

/// Maps a server identifier to the root of its data directory
#[async_trait]
pub trait ServerRegistry: Send + Sync {
    /// `None` if the server is not known on this node
    async fn root_for(&self, server_uuid: Uuid) -> Option<PathBuf>;
}

/// Registry backed by the volume layout: every server owns
/// `<data_dir>/<uuid>`, and a server exists when that directory does.
#[derive(Debug, Clone)]
pub struct VolumeRegistry {
    data_dir: PathBuf,
}

impl VolumeRegistry {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }
}

#[async_trait]
impl ServerRegistry for VolumeRegistry {
    async fn root_for(&self, server_uuid: Uuid) -> Option<PathBuf> {
        let root = self.data_dir.join(server_uuid.to_string());
        let metadata = tokio::fs::metadata(&root).await.ok()?;
        metadata.is_dir().then_some(root)
    }
}
