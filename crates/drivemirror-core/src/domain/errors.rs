//! Domain error types
//!
//! [`DomainError`] covers validation of domain values. [`RemoteError`] is the
//! taxonomy every remote-facing operation reports, from the adapter up through
//! the sync engine, without translation.

use thiserror::Error;

/// Errors that can occur when constructing domain values
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid remote ID format
    #[error("Invalid remote ID: {0}")]
    InvalidRemoteId(String),

    /// Invalid page token
    #[error("Invalid page token: {0}")]
    InvalidPageToken(String),

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

/// Errors reported by remote directory operations
///
/// Adapters classify their failures into these variants. The sync engine
/// propagates them unchanged; only the adapter layer retries, and only
/// [`RemoteError::Transient`] failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Network failure or rate limiting; a retry may succeed
    #[error("Transient remote error: {0}")]
    Transient(String),

    /// Invalid id, permission denied, quota exhausted
    #[error("Remote error: {0}")]
    Permanent(String),

    /// The remote refused a creation because the item already exists
    #[error("Remote conflict: {0}")]
    Conflict(String),

    /// Internal invariant violation while resolving a folder
    #[error("Reconciliation failed: {0}")]
    Reconciliation(String),

    /// The session was cancelled before the call was issued
    #[error("Operation cancelled")]
    Cancelled,
}

impl RemoteError {
    /// Returns true if the failure is worth retrying at the client layer
    pub fn is_transient(&self) -> bool {
        matches!(self, RemoteError::Transient(_))
    }
}

impl From<DomainError> for RemoteError {
    fn from(err: DomainError) -> Self {
        RemoteError::Permanent(err.to_string())
    }
}
