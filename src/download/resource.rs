//! Resource provider contract
//!
//! A provider turns the identifier carried by a download token into an open,
//! seekable handle plus a metadata snapshot. The handle is an owned value:
//! dropping it is the only way it is released.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncSeek};

use super::ResourceKind;
use crate::token::DownloadClaims;

/// Readable, seekable resource handle
pub trait ResourceReader: AsyncRead + AsyncSeek + Send + Unpin {}

impl<T> ResourceReader for T where T: AsyncRead + AsyncSeek + Send + Unpin {}

/// Snapshot of a resource taken when it is opened
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceMetadata {
    /// Name offered to the client in `Content-Disposition`
    pub name: String,
    /// Size in bytes
    pub size: u64,
    /// Modification time, if the store can report one
    pub last_modified: Option<DateTime<Utc>>,
    pub is_directory: bool,
}

impl ResourceMetadata {
    /// Build a snapshot from filesystem metadata
    pub fn from_fs(name: String, metadata: &std::fs::Metadata) -> Self {
        Self {
            name,
            size: metadata.len(),
            last_modified: metadata.modified().ok().map(DateTime::<Utc>::from),
            is_directory: metadata.is_dir(),
        }
    }
}

/// An opened resource: handle plus metadata
pub struct OpenResource {
    pub reader: Box<dyn ResourceReader>,
    pub metadata: ResourceMetadata,
}

impl OpenResource {
    pub fn new(reader: impl ResourceReader + 'static, metadata: ResourceMetadata) -> Self {
        Self {
            reader: Box::new(reader),
            metadata,
        }
    }
}

impl std::fmt::Debug for OpenResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenResource")
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

/// Resource lookup failure
#[derive(Debug, Error)]
pub enum LocateError {
    /// Unknown server, missing resource, or a path outside the server root
    #[error("resource not found")]
    NotFound,
    #[error("failed to open resource: {0}")]
    Io(#[source] io::Error),
}

impl From<io::Error> for LocateError {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::NotFound {
            Self::NotFound
        } else {
            Self::Io(err)
        }
    }
}

/// Resolves token claims to an open resource of one kind
#[async_trait]
pub trait ResourceProvider: Send + Sync {
    fn kind(&self) -> ResourceKind;

    async fn open(&self, claims: &DownloadClaims) -> Result<OpenResource, LocateError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_io_error_maps_to_not_found() {
        let err = LocateError::from(io::Error::from(io::ErrorKind::NotFound));
        assert!(matches!(err, LocateError::NotFound));

        let err = LocateError::from(io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(err, LocateError::Io(_)));
    }

    #[test]
    fn test_metadata_from_fs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("world.zip");
        std::fs::write(&path, b"0123456789").unwrap();

        let meta = ResourceMetadata::from_fs(
            "world.zip".to_string(),
            &std::fs::metadata(&path).unwrap(),
        );
        assert_eq!(meta.size, 10);
        assert!(!meta.is_directory);
        assert!(meta.last_modified.is_some());

        let meta =
            ResourceMetadata::from_fs("d".to_string(), &std::fs::metadata(dir.path()).unwrap());
        assert!(meta.is_directory);
    }
}
