//! Storage module
//!
//! On-disk [`ResourceProvider`](crate::download::ResourceProvider)
//! implementations: backup archives and per-server volumes.

mod backup;
mod filesystem;
mod registry;

pub use backup::LocalBackupStore;
pub use filesystem::ServerFilesystem;
pub use registry::{ServerRegistry, VolumeRegistry};
