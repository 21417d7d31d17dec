//! Download token module
//!
//! Tokens are signed by the control plane and carry the identity of the
//! resource to serve plus a single-use marker. The download handlers only
//! ever see resolved [`DownloadClaims`].

mod jwt;
mod ledger;

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::download::ResourceKind;

pub use jwt::JwtTokenValidator;
#[cfg(test)]
pub use jwt::issue;
pub use ledger::ConsumptionLedger;

/// Resource named by a token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceRef {
    Backup(Uuid),
    /// Path relative to the server's root directory
    File(String),
}

/// Verified token claims
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadClaims {
    pub server_uuid: Uuid,
    pub resource: ResourceRef,
    /// Single-use marker
    pub unique_id: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("no download token was provided")]
    Missing,
    #[error("token verification failed: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),
    #[error("token is missing the {0} claim")]
    MissingClaim(&'static str),
    #[error("token backup_uuid is not a valid UUID: {0}")]
    InvalidBackupId(#[source] uuid::Error),
}

/// Token verification and single-use tracking
pub trait TokenValidator: Send + Sync {
    /// Verify `raw` and resolve it into claims for a resource of `kind`
    fn parse(&self, kind: ResourceKind, raw: &str) -> Result<DownloadClaims, TokenError>;

    /// Returns true and marks the token consumed on the first call for its
    /// unique id; false on every later call. Must be atomic.
    fn consume(&self, claims: &DownloadClaims) -> bool;
}
