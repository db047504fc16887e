use gvc_store::StoreError;
use gvc_types::ObjectId;

/// Errors from revision tree operations.
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    /// A node references a tree that is not in the store.
    #[error("missing child tree {0}")]
    MissingChild(ObjectId),

    /// A stored tree violates the leaf/bucket invariants.
    #[error("malformed tree {id}: {reason}")]
    Malformed { id: ObjectId, reason: String },

    /// A path component that must be a tree names a feature.
    #[error("not a tree: {0}")]
    NotATree(String),

    #[error("invalid path: {0:?}")]
    InvalidPath(String),

    /// Two entries with the same name at one level.
    #[error("duplicate entry name: {0}")]
    DuplicateName(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type TreeResult<T> = Result<T, TreeError>;
