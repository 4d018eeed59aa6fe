//! # fieldsync-forms
//!
//! Client for the upstream mobile-forms REST API: fetching submissions,
//! marking them consumed, downloading media and generated reports, and
//! reading/replacing external lists.
//!
//! The [`fieldsync_core::FormsApi`] trait is the seam; this crate supplies
//! the reqwest-backed implementation with per-category timeout budgets.

pub mod client;

pub use client::{FormsClient, FormsConfig};
