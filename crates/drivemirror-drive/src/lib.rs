//! DriveMirror Drive - Google Drive v3 REST adapter
//!
//! Provides:
//! - A typed async HTTP client for the Drive `files` endpoints
//! - Proactive rate limiting and bounded retry of transient failures
//! - The [`IRemoteDirectory`](drivemirror_core::ports::IRemoteDirectory) implementation
//! - Access-token lookup for the command-line tools
//!
//! ## Modules
//!
//! - [`auth`] - Access token lookup (environment or credentials file)
//! - [`client`] - Drive REST client with retry handling
//! - [`provider`] - `IRemoteDirectory` adapter over the client
//! - [`rate_limit`] - Token buckets, retry policy, Retry-After parsing

pub mod auth;
pub mod client;
pub mod provider;
pub mod rate_limit;

use std::time::Duration;

use drivemirror_core::domain::RemoteError;
use thiserror::Error;

pub use client::DriveClient;
pub use provider::DriveDirectory;

/// Errors that can occur when communicating with the Drive API
#[derive(Debug, Error)]
pub enum DriveError {
    /// Authentication credentials are invalid or expired
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Insufficient permissions for the requested operation
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The requested file or folder does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The item already exists or was modified concurrently
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Rate limit exceeded (HTTP 429, or 403 with a rate-limit reason)
    #[error("Too many requests, retry after {retry_after:?}")]
    TooManyRequests {
        /// Server-suggested wait, if a Retry-After header was sent
        retry_after: Option<Duration>,
    },

    /// A server-side error occurred (5xx)
    #[error("Server error: {0}")]
    ServerError(String),

    /// Any other rejected request (400, 411, ...)
    #[error("Request rejected ({status}): {message}")]
    Rejected {
        status: u16,
        message: String,
    },

    /// A network-level error occurred
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// The API response could not be parsed or was malformed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The caller cancelled while the request was waiting to be sent
    #[error("Cancelled")]
    Cancelled,

    /// A transient failure persisted through every retry
    #[error("Giving up after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<DriveError>,
    },
}

impl DriveError {
    /// Returns true if the request may succeed when sent again
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DriveError::TooManyRequests { .. }
                | DriveError::ServerError(_)
                | DriveError::NetworkError(_)
        )
    }

    /// Returns true if the server asked the client to slow down
    ///
    /// A throttled request was rejected before being applied, so it is safe
    /// to send again even when it mutates remote state.
    pub fn is_throttle(&self) -> bool {
        matches!(self, DriveError::TooManyRequests { .. })
    }

    /// Server-suggested delay before retrying
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            DriveError::TooManyRequests { retry_after } => *retry_after,
            _ => None,
        }
    }
}

impl From<DriveError> for RemoteError {
    fn from(err: DriveError) -> Self {
        match err {
            DriveError::TooManyRequests { .. }
            | DriveError::ServerError(_)
            | DriveError::NetworkError(_)
            | DriveError::RetriesExhausted { .. } => RemoteError::Transient(err.to_string()),
            DriveError::Conflict(_) => RemoteError::Conflict(err.to_string()),
            DriveError::Cancelled => RemoteError::Cancelled,
            DriveError::Unauthorized(_)
            | DriveError::Forbidden(_)
            | DriveError::NotFound(_)
            | DriveError::Rejected { .. }
            | DriveError::InvalidResponse(_) => RemoteError::Permanent(err.to_string()),
        }
    }
}
