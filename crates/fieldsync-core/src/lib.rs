//! # fieldsync-core
//!
//! Core types, traits, and abstractions for fieldsync.
//!
//! This crate provides the foundational data structures and trait
//! definitions that the other fieldsync crates depend on: the submission
//! and equipment domain model, the job queue contract, the external-list
//! wire codec, and the shared error and logging schema.

pub mod defaults;
pub mod error;
pub mod listwire;
pub mod logging;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use models::*;
pub use traits::*;
