pub mod config;
pub mod context;
pub mod copy;
pub mod list;
pub mod root;
pub mod sync;
pub mod tree;
