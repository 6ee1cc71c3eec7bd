//! DriveMirror Core - Domain types and port definitions
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain types** - `RemoteId`, `PageToken`, `Item`, `Listing`
//! - **Error taxonomy** - `RemoteError` (transient / permanent / reconciliation)
//! - **Port definitions** - `IRemoteDirectory`, the remote listing/creation/copy boundary
//! - **Configuration** - YAML-backed settings shared by every crate
//!
//! # Architecture
//!
//! The domain module holds pure data with no I/O. Ports define the trait
//! interfaces that adapter crates (`drivemirror-drive`) implement and the
//! engine crate (`drivemirror-sync`) consumes.

pub mod config;
pub mod domain;
pub mod ports;
