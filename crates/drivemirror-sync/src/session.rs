//! Sync session context
//!
//! A [`SyncSession`] is built once per command invocation and passed by
//! reference into the classifier, resolver, engine and tree printer. It owns:
//!
//! - the remote directory client
//! - the cancellation token honored before every remote call
//! - the root folder id, resolved at most once
//! - the per-(parent, name) folder creation locks, kept only while some
//!   task holds or waits on them

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OnceCell, OwnedMutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use drivemirror_core::domain::{PageToken, RemoteError, RemoteId};
use drivemirror_core::ports::{IRemoteDirectory, ListingPage};

type FolderKey = (RemoteId, String);

/// Shared state for one sync invocation
pub struct SyncSession {
    remote: Arc<dyn IRemoteDirectory>,
    cancel: CancellationToken,
    root_id: OnceCell<RemoteId>,
    folder_locks: DashMap<FolderKey, Arc<Mutex<()>>>,
}

impl std::fmt::Debug for SyncSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncSession")
            .field("cancelled", &self.cancel.is_cancelled())
            .field("root_id", &self.root_id.get())
            .field("folder_locks", &self.folder_locks.len())
            .finish()
    }
}

impl SyncSession {
    pub fn new(remote: Arc<dyn IRemoteDirectory>) -> Self {
        Self {
            remote,
            cancel: CancellationToken::new(),
            root_id: OnceCell::new(),
            folder_locks: DashMap::new(),
        }
    }

    /// Uses an externally owned token, e.g. one cancelled by a Ctrl-C handler
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    fn check_cancelled(&self) -> Result<(), RemoteError> {
        if self.cancel.is_cancelled() {
            debug!("Session cancelled, refusing remote call");
            return Err(RemoteError::Cancelled);
        }
        Ok(())
    }

    /// Concrete id of the user's root folder, fetched on first use
    pub async fn root_id(&self) -> Result<RemoteId, RemoteError> {
        let id = self
            .root_id
            .get_or_try_init(|| async {
                self.check_cancelled()?;
                let id = self.remote.get_root_id().await?;
                debug!(root = %id, "Resolved root folder id");
                Ok::<_, RemoteError>(id)
            })
            .await?;
        Ok(id.clone())
    }

    /// Maps the `root` alias to the concrete root id; other ids pass through
    pub async fn resolve(&self, id: &RemoteId) -> Result<RemoteId, RemoteError> {
        if id.is_root_alias() {
            self.root_id().await
        } else {
            Ok(id.clone())
        }
    }

    pub async fn list_children(
        &self,
        parent: &RemoteId,
        name_filter: Option<&str>,
        page_token: Option<&PageToken>,
    ) -> Result<ListingPage, RemoteError> {
        self.check_cancelled()?;
        self.remote
            .list_children(parent, name_filter, page_token)
            .await
    }

    pub async fn create_folder(
        &self,
        name: &str,
        parent: &RemoteId,
    ) -> Result<RemoteId, RemoteError> {
        self.check_cancelled()?;
        self.remote.create_folder(name, parent).await
    }

    pub async fn copy_file(
        &self,
        file: &RemoteId,
        target_parent: &RemoteId,
    ) -> Result<RemoteId, RemoteError> {
        self.check_cancelled()?;
        self.remote.copy_file(file, target_parent).await
    }

    /// Serializes folder resolution for one (parent, name) pair until the
    /// returned lease is dropped
    pub(crate) async fn lock_folder(&self, parent: &RemoteId, name: &str) -> FolderLease<'_> {
        let key = (parent.clone(), name.to_string());
        let lock = self.folder_locks.entry(key.clone()).or_default().clone();
        let guard = lock.lock_owned().await;
        FolderLease {
            session: self,
            key,
            guard: Some(guard),
        }
    }

    /// Number of (parent, name) pairs currently locked or awaited
    pub(crate) fn active_folder_locks(&self) -> usize {
        self.folder_locks.len()
    }
}

/// Exclusive hold on one (parent, name) pair
///
/// Dropping it releases the mutex, then removes the map entry when no other
/// task holds a handle to it.
pub(crate) struct FolderLease<'a> {
    session: &'a SyncSession,
    key: FolderKey,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for FolderLease<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.session
            .folder_locks
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}
