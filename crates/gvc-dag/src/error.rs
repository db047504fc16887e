//! Error types for the commit graph.

use gvc_store::StoreError;
use gvc_types::ObjectId;

/// Errors that can occur during commit graph operations.
#[derive(Debug, thiserror::Error)]
pub enum DagError {
    /// A commit was not found in the graph or the store.
    #[error("commit not found: {0}")]
    CommitNotFound(ObjectId),

    /// A parent reference points to a commit that is not in the graph.
    #[error("commit {commit} references missing parent {parent}")]
    DanglingParent { commit: ObjectId, parent: ObjectId },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Convenience alias for DAG results.
pub type DagResult<T> = Result<T, DagError>;
