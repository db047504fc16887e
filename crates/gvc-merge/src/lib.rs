//! Merge and conflict engine for GVC.
//!
//! # Key Types
//!
//! - [`merge_trees`] / [`MergeReport`] -- three-way merge of two root trees
//! - [`MergeStrategy`] -- record, or auto-resolve to ours/theirs
//! - [`Conflict`] -- a path changed differently on both sides
//! - [`ConflictIndex`] -- unresolved conflicts keyed by path

pub mod conflict;
pub mod error;
pub mod merge;

pub use conflict::{Conflict, ConflictIndex};
pub use error::{MergeError, MergeResult};
pub use merge::{merge_trees, MergeOptions, MergeReport, MergeStrategy};
