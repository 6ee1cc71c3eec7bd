//! Folder resolver
//!
//! Finds a child folder by name or creates it. This is the idempotency
//! boundary of a sync: running it twice for the same (name, parent) pair
//! yields the same folder.
//!
//! ## Design Notes
//!
//! - Resolution for one (parent, name) pair is serialized through a lock held
//!   by the [`SyncSession`], so concurrent identical intents in one process
//!   create at most one folder.
//! - A `Conflict` from the remote on creation is treated as "someone else
//!   created it": the parent is re-listed and the existing id returned.
//! - Duplicate target folders are never merged or deleted; the configured
//!   [`DuplicateFolderPolicy`] decides whether the first match is used.

use tracing::{debug, info, warn};

use drivemirror_core::config::DuplicateFolderPolicy;
use drivemirror_core::domain::{Listing, RemoteError, RemoteId};

use crate::classifier::ListingClassifier;
use crate::session::SyncSession;

/// Outcome of a folder resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The folder was already present
    Existing(RemoteId),
    /// The folder was created by this call
    Created(RemoteId),
}

impl Resolution {
    pub fn id(&self) -> &RemoteId {
        match self {
            Resolution::Existing(id) | Resolution::Created(id) => id,
        }
    }

    pub fn into_id(self) -> RemoteId {
        match self {
            Resolution::Existing(id) | Resolution::Created(id) => id,
        }
    }

    pub fn was_created(&self) -> bool {
        matches!(self, Resolution::Created(_))
    }
}

/// Find-or-create for named child folders
#[derive(Debug, Clone, Copy)]
pub struct FolderResolver<'a> {
    session: &'a SyncSession,
    policy: DuplicateFolderPolicy,
}

impl<'a> FolderResolver<'a> {
    pub fn new(session: &'a SyncSession) -> Self {
        Self {
            session,
            policy: DuplicateFolderPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: DuplicateFolderPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Returns the id of the folder `name` under `parent`, creating it if absent
    pub async fn ensure_folder(&self, name: &str, parent: &RemoteId) -> Result<RemoteId, RemoteError> {
        self.resolve_folder(name, parent).await.map(Resolution::into_id)
    }

    /// Like [`ensure_folder`](Self::ensure_folder), but reports whether the folder was created
    pub async fn resolve_folder(
        &self,
        name: &str,
        parent: &RemoteId,
    ) -> Result<Resolution, RemoteError> {
        let _lease = self.session.lock_folder(parent, name).await;

        let listing = self.list(parent).await?;
        if let Some(id) = self.select(&listing, name, parent)? {
            debug!(name, parent = %parent, id = %id, "Folder already present");
            return Ok(Resolution::Existing(id));
        }

        match self.session.create_folder(name, parent).await {
            Ok(id) => {
                info!(name, parent = %parent, id = %id, "Created folder");
                Ok(Resolution::Created(id))
            }
            Err(RemoteError::Conflict(reason)) => {
                warn!(name, parent = %parent, %reason, "Folder creation conflicted, re-resolving");
                let listing = self.list(parent).await?;
                match self.select(&listing, name, parent)? {
                    Some(id) => Ok(Resolution::Existing(id)),
                    None => Err(RemoteError::Reconciliation(format!(
                        "creation of folder '{}' under {} conflicted but no such folder is listed",
                        name, parent
                    ))),
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Read-only lookup of the folder `name` under `parent`
    pub async fn find_folder(
        &self,
        name: &str,
        parent: &RemoteId,
    ) -> Result<Option<RemoteId>, RemoteError> {
        let listing = self.list(parent).await?;
        self.select(&listing, name, parent)
    }

    async fn list(&self, parent: &RemoteId) -> Result<Listing, RemoteError> {
        ListingClassifier::new(self.session).list_all(parent, None).await
    }

    fn select(
        &self,
        listing: &Listing,
        name: &str,
        parent: &RemoteId,
    ) -> Result<Option<RemoteId>, RemoteError> {
        let mut matches = listing.folders_named(name);
        let Some(first) = matches.next() else {
            return Ok(None);
        };
        let extra = matches.count();
        if extra > 0 {
            match self.policy {
                DuplicateFolderPolicy::FirstMatch => {
                    warn!(
                        name,
                        parent = %parent,
                        count = extra + 1,
                        chosen = %first.id,
                        "Duplicate target folders, using the first match"
                    );
                }
                DuplicateFolderPolicy::Error => {
                    return Err(RemoteError::Reconciliation(format!(
                        "{} folders named '{}' under {}",
                        extra + 1,
                        name,
                        parent
                    )));
                }
            }
        }
        Ok(Some(first.id.clone()))
    }
}
