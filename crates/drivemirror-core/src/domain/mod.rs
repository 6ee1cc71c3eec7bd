//! Domain entities
//!
//! - Newtypes for opaque remote identifiers and pagination cursors
//! - Item snapshots and classified listings
//! - Error types shared across the workspace

pub mod errors;
pub mod item;
pub mod newtypes;

pub use errors::{DomainError, RemoteError};
pub use item::{Item, ItemKind, Listing};
pub use newtypes::*;
