//! Port definitions (hexagonal architecture interfaces)
//!
//! - [`IRemoteDirectory`] - Remote listing, folder creation and file copy

pub mod remote_directory;

pub use remote_directory::{IRemoteDirectory, ListingPage};
