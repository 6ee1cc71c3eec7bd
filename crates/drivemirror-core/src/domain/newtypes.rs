//! Domain newtypes with validation
//!
//! Remote identifiers and page tokens are opaque strings issued by the
//! service. The wrappers only guarantee they are safe to embed in request
//! paths and query expressions; their content is never interpreted.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

/// Well-known alias the remote service accepts for the user's root folder
pub const ROOT_ALIAS: &str = "root";

// ============================================================================
// RemoteId
// ============================================================================

/// Server-assigned identifier of a folder or file
///
/// Immutable once created. Two items are never considered the same by
/// comparing ids during reconciliation; names are the reconciliation key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RemoteId(String);

impl RemoteId {
    /// Create a new RemoteId
    ///
    /// # Errors
    /// Returns error if the ID is empty or contains whitespace, quotes or slashes
    pub fn new(id: String) -> Result<Self, DomainError> {
        if id.is_empty() {
            return Err(DomainError::InvalidRemoteId(
                "Remote ID cannot be empty".to_string(),
            ));
        }

        if id
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || matches!(c, '/' | '\\' | '\''))
        {
            return Err(DomainError::InvalidRemoteId(format!(
                "Remote ID contains invalid characters: {id}"
            )));
        }

        Ok(Self(id))
    }

    /// The `root` alias, resolved to a concrete id by the session
    #[must_use]
    pub fn root_alias() -> Self {
        Self(ROOT_ALIAS.to_string())
    }

    /// Returns true if this is the `root` alias rather than a concrete id
    #[must_use]
    pub fn is_root_alias(&self) -> bool {
        self.0 == ROOT_ALIAS
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RemoteId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RemoteId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for RemoteId {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RemoteId> for String {
    fn from(id: RemoteId) -> Self {
        id.0
    }
}

// ============================================================================
// PageToken
// ============================================================================

/// Opaque pagination cursor returned by a listing call
///
/// Single-use and request-scoped; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageToken(String);

impl PageToken {
    /// Create a new PageToken
    ///
    /// # Errors
    /// Returns error if the token is empty
    pub fn new(token: String) -> Result<Self, DomainError> {
        if token.is_empty() {
            return Err(DomainError::InvalidPageToken(
                "Page token cannot be empty".to_string(),
            ));
        }
        Ok(Self(token))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for PageToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
