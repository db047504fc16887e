//! Error types for the index crate.

use gvc_diff::DiffError;
use gvc_merge::MergeError;
use gvc_refs::RefError;
use gvc_store::StoreError;
use gvc_tree::TreeError;

/// Errors that can occur during working tree and index operations.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// Nothing exists at the given path.
    #[error("path not found: {0}")]
    PathNotFound(String),

    /// Something already exists at the given path.
    #[error("path already exists: {0}")]
    AlreadyExists(String),

    /// The path names a tree where a feature was expected.
    #[error("not a feature: {0}")]
    NotAFeature(String),

    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("ref error: {0}")]
    Ref(#[from] RefError),

    #[error("diff error: {0}")]
    Diff(#[from] DiffError),

    /// The persisted conflict index could not be read or written.
    #[error("conflict index: {0}")]
    Conflicts(#[from] MergeError),
}

/// Convenience alias for index results.
pub type IndexResult<T> = Result<T, IndexError>;
