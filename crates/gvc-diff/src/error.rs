//! Error types for the diff crate.

use gvc_store::StoreError;
use gvc_tree::TreeError;

/// Errors that can occur during diff operations.
#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    /// The traversal was cancelled through its cancel flag.
    #[error("diff cancelled")]
    Cancelled,

    /// A tree could not be read or rewritten.
    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Convenience alias for diff results.
pub type DiffResult<T> = Result<T, DiffError>;
