//! # fieldsync-listsync
//!
//! Pushes the locally-tracked active equipment back into the upstream
//! forms platform's external lists without destroying data the local
//! database does not track:
//!
//! - [`builder`]: active snapshot + fully-archived identity set per agency
//! - [`merge`]: the pure two-way merge with its safety properties
//! - [`runner`]: snapshot backup, decode, merge, push, prune

pub mod builder;
pub mod merge;
pub mod runner;

pub use builder::{item_from_row, ListBuilder};
pub use merge::merge;
pub use runner::{SyncConfig, SyncRunner};
