//! Working tree and staging area for GVC.
//!
//! Both are ordinary revision trees addressed through refs: the working
//! tree lives at `WORK_HEAD` and the staging area at `STAGE_HEAD`. Edits
//! write new tree objects and move the ref by compare-and-swap. The staging
//! area also holds the conflict index left behind by a merge.
//!
//! # Key Types
//!
//! - [`WorkingTree`] -- feature inserts, updates and deletes
//! - [`StagingArea`] -- the next commit's tree plus unresolved conflicts
//! - [`WorkdirStatus`] -- staged, unstaged and conflicted paths
//! - [`add`] / [`status`] -- the two operations spanning both trees

pub mod error;
pub mod ops;
pub mod staging;
pub mod status;
mod tree_ref;
pub mod working_tree;

#[cfg(test)]
mod testing;

pub use error::{IndexError, IndexResult};
pub use ops::{add, status};
pub use staging::StagingArea;
pub use status::{StatusEntry, WorkdirStatus};
pub use tree_ref::head_tree_id;
pub use working_tree::WorkingTree;
