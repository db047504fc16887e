//! Error types for the merge crate.

use gvc_diff::DiffError;
use gvc_store::StoreError;
use gvc_tree::TreeError;

/// Errors that can occur while merging trees or handling conflict records.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error("diff failed: {0}")]
    Diff(#[from] DiffError),

    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A conflict line or document could not be parsed.
    #[error("invalid conflict record: {0}")]
    InvalidConflict(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience alias for merge results.
pub type MergeResult<T> = Result<T, MergeError>;
