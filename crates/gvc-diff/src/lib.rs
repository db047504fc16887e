//! Diff engine for GVC.
//!
//! Compares two revision trees top-down, skipping every sub-tree and bucket
//! whose id is unchanged, and yields one entry per changed path.
//!
//! # Key Types
//!
//! - [`DiffTree`] / [`DiffIter`] -- lazy, filterable, cancellable traversal
//! - [`DiffEntry`] / [`ChangeType`] -- one changed path
//! - [`DiffSummary`] -- counts by change type
//! - [`apply_diff`] -- replay entries onto a tree

pub mod apply;
pub mod entry;
pub mod error;
pub mod tree_diff;

pub use apply::apply_diff;
pub use entry::{ChangeType, DiffEntry, DiffSummary};
pub use error::{DiffError, DiffResult};
pub use tree_diff::{diff_trees, DiffIter, DiffTree};
