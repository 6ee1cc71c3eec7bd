//! DriveMirror Sync - One-way remote tree synchronization
//!
//! Provides:
//! - A session context owning the remote client, cancellation and root id
//! - Fully drained, classified listings
//! - Idempotent folder resolution
//! - The recursive folder-then-file reconciliation engine
//!
//! ## Modules
//!
//! - [`session`] - [`SyncSession`] context object shared by every component
//! - [`classifier`] - Drains pagination and partitions folders from files
//! - [`resolver`] - Finds or creates a named folder under a parent
//! - [`engine`] - Recursive sync driver and progress events
//! - [`tree`] - Textual subtree rendering for inspection

pub mod classifier;
pub mod engine;
pub mod resolver;
pub mod session;
pub mod tree;

pub use classifier::ListingClassifier;
pub use engine::{SyncEngine, SyncEvent, SyncOptions, SyncReport};
pub use resolver::{FolderResolver, Resolution};
pub use session::SyncSession;
pub use tree::TreePrinter;
