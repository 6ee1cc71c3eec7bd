//! Remote directory port (driven/secondary port)
//!
//! The interface to a hierarchical cloud storage service whose only identity
//! key is a server-assigned opaque id. The primary implementation targets the
//! Google Drive v3 REST API (`drivemirror-drive`).
//!
//! ## Design Notes
//!
//! - Errors are typed [`RemoteError`]s that keep transient and permanent
//!   failures apart.
//! - No method caches anything: every call is a live round-trip.
//! - `create_folder` and `copy_file` mutate remote state once per call;
//!   callers are responsible for not issuing duplicate intents.

use crate::domain::{Item, PageToken, RemoteError, RemoteId};

/// One page of a children listing
#[derive(Debug, Clone, Default)]
pub struct ListingPage {
    /// Items on this page, in the order the remote returned them
    pub items: Vec<Item>,
    /// Cursor for the next page; `None` on the final page
    pub next_page_token: Option<PageToken>,
}

/// Port trait for remote folder/file operations
///
/// Implementations own pagination mechanics, rate limiting and the retry of
/// transient failures. A [`RemoteError::Transient`] escaping an implementation
/// means its retry budget is exhausted.
#[async_trait::async_trait]
pub trait IRemoteDirectory: Send + Sync {
    /// Lists one page of the children of `parent`
    ///
    /// # Arguments
    /// * `parent` - Container whose children are listed
    /// * `name_filter` - Optional server-side name substring filter
    /// * `page_token` - Cursor from the previous page, `None` for the first page
    async fn list_children(
        &self,
        parent: &RemoteId,
        name_filter: Option<&str>,
        page_token: Option<&PageToken>,
    ) -> Result<ListingPage, RemoteError>;

    /// Creates a folder named `name` under `parent` and returns its id
    async fn create_folder(&self, name: &str, parent: &RemoteId) -> Result<RemoteId, RemoteError>;

    /// Copies `file` into `target_parent` and returns the id of the copy
    async fn copy_file(
        &self,
        file: &RemoteId,
        target_parent: &RemoteId,
    ) -> Result<RemoteId, RemoteError>;

    /// Resolves the concrete id of the user's root folder
    async fn get_root_id(&self) -> Result<RemoteId, RemoteError>;
}
