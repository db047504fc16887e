//! Repository API for GVC.
//!
//! Ties the object store, trees, refs, history, diff, merge and index crates
//! together into the operations a user runs: init, add, commit, checkout,
//! merge, branch, tag, reset, log and transactions.
//!
//! # Key Types
//!
//! - [`Repository`] -- an initialized repository over shared stores
//! - [`RepoContext`] -- every operation; repositories and transactions both deref to one
//! - [`Transaction`] -- an isolated ref namespace published back by CAS
//! - [`CheckoutResult`] / [`CheckoutFailure`] -- the checkout contract
//! - [`RepositoryConfig`] -- TOML configuration

pub mod branch;
pub mod checkout;
pub mod commit;
pub mod config;
pub mod context;
pub mod error;
pub mod merge;
pub mod repository;
pub mod reset;
pub mod revision;
pub mod transaction;

#[cfg(test)]
mod scenarios;
#[cfg(test)]
mod testing;

pub use checkout::{CheckoutFailure, CheckoutKind, CheckoutOptions, CheckoutResult};
pub use commit::CommitOptions;
pub use config::{RepositoryConfig, TransactionConfig, UserConfig};
pub use context::{ConflictDescription, LogEntry, RepoContext};
pub use error::{ErrorKind, RepoError, RepoResult};
pub use merge::{BranchMergeOptions, MergeOutcome};
pub use repository::Repository;
pub use reset::ResetMode;
pub use transaction::{Transaction, TransactionReport};

// Re-export the types callers handle most.
pub use gvc_index::{StatusEntry, WorkdirStatus};
pub use gvc_merge::{Conflict, MergeStrategy};
pub use gvc_refs::Head;
pub use gvc_tree::NodeRef;
pub use gvc_types::{ObjectId, Person};
