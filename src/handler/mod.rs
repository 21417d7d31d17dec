//! Request handler module
//!
//! Responsible for request routing dispatch. The download logic itself lives
//! in [`crate::download`].

pub mod router;

// Re-export main entry point
pub use router::{handle_request, BACKUP_DOWNLOAD_PATH, FILE_DOWNLOAD_PATH};
