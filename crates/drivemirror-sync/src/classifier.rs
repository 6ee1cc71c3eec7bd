//! Listing classifier
//!
//! Drains every page of a children listing before anything is decided about
//! its content, then partitions the accumulated items into folders and files
//! sorted by name. A failure on any page aborts the whole listing; pages
//! already fetched are discarded rather than retried.

use std::collections::HashSet;

use tracing::debug;

use drivemirror_core::domain::{Item, Listing, PageToken, RemoteError, RemoteId};

use crate::session::SyncSession;

/// Produces complete, classified listings through a [`SyncSession`]
#[derive(Debug, Clone, Copy)]
pub struct ListingClassifier<'a> {
    session: &'a SyncSession,
}

impl<'a> ListingClassifier<'a> {
    pub fn new(session: &'a SyncSession) -> Self {
        Self { session }
    }

    /// Lists every child of `parent`, following page tokens to the end
    ///
    /// # Errors
    /// Any error from the remote is returned as-is. A page that hands back
    /// any token already followed in this listing is reported as a
    /// permanent error.
    pub async fn list_all(
        &self,
        parent: &RemoteId,
        name_filter: Option<&str>,
    ) -> Result<Listing, RemoteError> {
        let mut items: Vec<Item> = Vec::new();
        let mut token: Option<PageToken> = None;
        let mut seen: HashSet<PageToken> = HashSet::new();
        let mut pages = 0u32;

        loop {
            let page = self
                .session
                .list_children(parent, name_filter, token.as_ref())
                .await?;
            pages += 1;
            items.extend(page.items);

            match page.next_page_token {
                Some(next) if !seen.insert(next.clone()) => {
                    return Err(RemoteError::Permanent(format!(
                        "listing of {} did not advance past page {}",
                        parent, pages
                    )));
                }
                Some(next) => token = Some(next),
                None => break,
            }
        }

        let listing = Listing::classify(items);
        debug!(
            parent = %parent,
            pages,
            folders = listing.folders.len(),
            files = listing.files.len(),
            "Listing drained"
        );
        Ok(listing)
    }
}
