//! Download module
//!
//! HEAD/GET handling for backup archives and server files. The logic is
//! written once in [`DownloadHandler`] against the [`ResourceProvider`]
//! contract; the storage layer supplies one provider per resource kind.

mod body;
pub mod buffer;
mod error;
mod handler;
mod resource;

use std::fmt;

pub use body::ResourceBody;
pub use buffer::{BufferPolicy, BufferThreshold};
pub use error::DownloadError;
pub use handler::{DownloadHandler, DownloadMethod, DownloadRequest};
pub use resource::{
    LocateError, OpenResource, ResourceMetadata, ResourceProvider, ResourceReader,
};

/// Kind of downloadable resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Backup,
    File,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Backup => write!(f, "backup"),
            Self::File => write!(f, "file"),
        }
    }
}
