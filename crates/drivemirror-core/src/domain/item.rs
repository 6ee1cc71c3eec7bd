//! Item snapshots and classified listings
//!
//! An [`Item`] is a read-only snapshot of a remote folder or file as of the
//! listing call that produced it. A [`Listing`] is the fully drained,
//! classified and name-sorted content of one parent.

use serde::{Deserialize, Serialize};

use super::newtypes::RemoteId;

/// Whether an item is a container or a leaf
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Folder,
    File,
}

/// A folder or file returned by a listing call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Opaque server-assigned id, only ever passed back into remote calls
    pub id: RemoteId,
    /// Human-readable name, the reconciliation key
    pub name: String,
    /// Classification, fixed for the lifetime of the snapshot
    pub kind: ItemKind,
}

impl Item {
    pub fn folder(id: RemoteId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            kind: ItemKind::Folder,
        }
    }

    pub fn file(id: RemoteId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            kind: ItemKind::File,
        }
    }

    #[must_use]
    pub fn is_folder(&self) -> bool {
        self.kind == ItemKind::Folder
    }
}

/// Children of one parent, partitioned by kind and sorted by name
///
/// Sorting is byte-wise on the name (case-sensitive, locale-independent) and
/// stable, so equal names keep the order the remote returned them in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    pub folders: Vec<Item>,
    pub files: Vec<Item>,
}

impl Listing {
    /// Partitions and sorts a fully accumulated set of items
    pub fn classify(items: Vec<Item>) -> Self {
        let (mut folders, mut files): (Vec<Item>, Vec<Item>) =
            items.into_iter().partition(Item::is_folder);
        folders.sort_by(|a, b| a.name.cmp(&b.name));
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Self { folders, files }
    }

    /// First folder with the given name, in sorted order
    pub fn find_folder(&self, name: &str) -> Option<&Item> {
        self.folders.iter().find(|f| f.name == name)
    }

    /// All folders with the given name
    pub fn folders_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Item> + 'a {
        self.folders.iter().filter(move |f| f.name == name)
    }

    /// Returns true if a file with the given name is present
    pub fn contains_file(&self, name: &str) -> bool {
        self.files.iter().any(|f| f.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.folders.is_empty() && self.files.is_empty()
    }

    pub fn len(&self) -> usize {
        self.folders.len() + self.files.len()
    }
}
