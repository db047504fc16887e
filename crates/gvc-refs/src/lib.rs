//! Reference management for GVC.
//!
//! Refs are the mutable, human-readable entry points into the immutable
//! object graph.
//!
//! # Architecture
//!
//! - **Branches** (`refs/heads/*`) point at commits and advance by
//!   compare-and-swap.
//! - **Tags** (`refs/tags/*`) are immutable once created.
//! - **Remote refs** (`refs/remotes/<remote>/*`) are written by an external
//!   replication layer.
//! - **HEAD** is a symbolic ref naming the current branch, or a direct ref
//!   when detached.
//! - **WORK_HEAD** / **STAGE_HEAD** point at the working-tree and index root
//!   trees; **ORIG_HEAD** / **MERGE_HEAD** record both sides of an
//!   in-progress merge.
//!
//! # Modules
//!
//! - [`error`] -- Error types for ref operations
//! - [`types`] -- [`RefValue`], [`Ref`], [`Head`]
//! - [`traits`] -- The [`RefStore`] trait
//! - [`names`] -- Well-known names and validation
//! - [`memory`] -- [`InMemoryRefStore`]

pub mod error;
pub mod memory;
pub mod names;
pub mod traits;
pub mod types;

pub use error::{RefError, Result};
pub use memory::InMemoryRefStore;
pub use names::{validate_branch_name, validate_remote_name, validate_tag_name};
pub use traits::{RefStore, MAX_SYMREF_DEPTH};
pub use types::{Head, Ref, RefValue};
