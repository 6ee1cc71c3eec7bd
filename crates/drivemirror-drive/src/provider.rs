//! DriveDirectory - IRemoteDirectory implementation for Google Drive v3
//!
//! Wraps the [`DriveClient`] and translates between Drive file resources and
//! the domain [`Item`] snapshots used by the sync engine.
//!
//! ## Design Notes
//!
//! - The children query always restricts to a single parent, so a listing
//!   never leaks items from another level.
//! - Trashed items are excluded unless `include_trashed` is set.
//! - The name filter is a server-side `name contains` clause; quotes and
//!   backslashes in the filter are escaped for the query language.

use tracing::debug;

use drivemirror_core::config::DriveConfig;
use drivemirror_core::domain::{Item, PageToken, RemoteError, RemoteId};
use drivemirror_core::ports::{IRemoteDirectory, ListingPage};

use crate::client::{DriveClient, DriveFile};
use crate::DriveError;

/// Remote directory backed by the Drive `files` resource
#[derive(Debug)]
pub struct DriveDirectory {
    client: DriveClient,
    page_size: u32,
    include_trashed: bool,
}

impl DriveDirectory {
    /// Creates a directory adapter with Drive's default page size
    pub fn new(client: DriveClient) -> Self {
        Self::from_config(client, &DriveConfig::default())
    }

    /// Creates a directory adapter using the listing settings from `config`
    pub fn from_config(client: DriveClient, config: &DriveConfig) -> Self {
        Self {
            client,
            page_size: config.page_size,
            include_trashed: config.include_trashed,
        }
    }

    pub fn client(&self) -> &DriveClient {
        &self.client
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Builds the `q` expression for a children listing
    pub fn children_query(&self, parent: &RemoteId, name_filter: Option<&str>) -> String {
        let mut query = format!("'{}' in parents", escape_query_value(parent.as_str()));
        if let Some(filter) = name_filter {
            query.push_str(&format!(" and name contains '{}'", escape_query_value(filter)));
        }
        if !self.include_trashed {
            query.push_str(" and trashed = false");
        }
        query
    }
}

/// Escapes a string literal for the Drive query language
pub fn escape_query_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

fn to_item(file: DriveFile) -> Result<Item, DriveError> {
    let is_folder = file.is_folder();
    let id = RemoteId::new(file.id)
        .map_err(|e| DriveError::InvalidResponse(format!("bad file id: {}", e)))?;
    Ok(if is_folder {
        Item::folder(id, file.name)
    } else {
        Item::file(id, file.name)
    })
}

fn to_remote_id(file: DriveFile) -> Result<RemoteId, DriveError> {
    RemoteId::new(file.id).map_err(|e| DriveError::InvalidResponse(format!("bad file id: {}", e)))
}

#[async_trait::async_trait]
impl IRemoteDirectory for DriveDirectory {
    async fn list_children(
        &self,
        parent: &RemoteId,
        name_filter: Option<&str>,
        page_token: Option<&PageToken>,
    ) -> Result<ListingPage, RemoteError> {
        debug!(parent = %parent, ?name_filter, "DriveDirectory::list_children");

        let query = self.children_query(parent, name_filter);
        let list = self
            .client
            .list_files(&query, self.page_size, page_token.map(PageToken::as_str))
            .await?;

        let items = list
            .files
            .into_iter()
            .map(to_item)
            .collect::<Result<Vec<_>, _>>()?;

        // An empty token would loop forever on the same page.
        let next_page_token = list
            .next_page_token
            .filter(|t| !t.is_empty())
            .map(PageToken::new)
            .transpose()?;

        Ok(ListingPage {
            items,
            next_page_token,
        })
    }

    async fn create_folder(&self, name: &str, parent: &RemoteId) -> Result<RemoteId, RemoteError> {
        debug!(name, parent = %parent, "DriveDirectory::create_folder");
        let created = self.client.create_folder(name, parent.as_str()).await?;
        Ok(to_remote_id(created)?)
    }

    async fn copy_file(
        &self,
        file: &RemoteId,
        target_parent: &RemoteId,
    ) -> Result<RemoteId, RemoteError> {
        debug!(file = %file, target = %target_parent, "DriveDirectory::copy_file");
        let copied = self
            .client
            .copy_file(file.as_str(), target_parent.as_str())
            .await?;
        Ok(to_remote_id(copied)?)
    }

    async fn get_root_id(&self) -> Result<RemoteId, RemoteError> {
        debug!("DriveDirectory::get_root_id");
        let root = self.client.get_file(RemoteId::root_alias().as_str()).await?;
        Ok(to_remote_id(root)?)
    }
}
