//! Error types for repository operations.

use std::fmt;

use gvc_dag::DagError;
use gvc_diff::DiffError;
use gvc_index::IndexError;
use gvc_merge::{Conflict, MergeError};
use gvc_refs::RefError;
use gvc_store::StoreError;
use gvc_tree::TreeError;

use crate::checkout::CheckoutFailure;

/// Coarse classification of every repository error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    /// Stored data is corrupt or a structure references missing objects.
    Integrity,
    /// The repository is not in a state that allows the operation.
    PreconditionFailed,
    /// Concurrent or divergent changes could not be reconciled.
    Conflict,
    InvalidArgument,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotFound => "not found",
            Self::Integrity => "integrity",
            Self::PreconditionFailed => "precondition failed",
            Self::Conflict => "conflict",
            Self::InvalidArgument => "invalid argument",
            Self::Internal => "internal",
        };
        f.write_str(s)
    }
}

/// Errors that can occur during repository operations.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// No repository has been initialized in the ref store.
    #[error("not a repository: HEAD is missing")]
    NotInitialized,

    /// A revision, ref or path did not resolve.
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation is not allowed in the current state.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// Unresolved merge conflicts block the operation.
    #[error("unmerged paths: {}", .0.join(", "))]
    UnmergedPaths(Vec<String>),

    #[error("checkout failed: {0}")]
    Checkout(#[from] CheckoutFailure),

    /// Replaying a transaction onto a moved branch produced conflicts.
    #[error("{} conflicting paths", .0.len())]
    Conflict(Vec<Conflict>),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("config write error: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error(transparent)]
    Ref(#[from] RefError),

    #[error(transparent)]
    Dag(#[from] DagError),

    #[error(transparent)]
    Diff(#[from] DiffError),

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error(transparent)]
    Index(#[from] IndexError),
}

impl RepoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotInitialized | Self::NotFound(_) => ErrorKind::NotFound,
            Self::InvalidArgument(_) | Self::ConfigParse(_) => ErrorKind::InvalidArgument,
            Self::Precondition(_) | Self::UnmergedPaths(_) | Self::Checkout(_) => {
                ErrorKind::PreconditionFailed
            }
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::ConfigWrite(_) | Self::Io(_) => ErrorKind::Internal,
            Self::Store(e) => store_kind(e),
            Self::Tree(e) => tree_kind(e),
            Self::Ref(e) => ref_kind(e),
            Self::Dag(e) => dag_kind(e),
            Self::Diff(e) => diff_kind(e),
            Self::Merge(e) => match e {
                MergeError::Diff(e) => diff_kind(e),
                MergeError::Tree(e) => tree_kind(e),
                MergeError::Store(e) => store_kind(e),
                MergeError::InvalidConflict(_) | MergeError::Serialization(_) => {
                    ErrorKind::InvalidArgument
                }
            },
            Self::Index(e) => match e {
                IndexError::PathNotFound(_) => ErrorKind::NotFound,
                IndexError::AlreadyExists(_) => ErrorKind::PreconditionFailed,
                IndexError::NotAFeature(_) => ErrorKind::InvalidArgument,
                IndexError::Tree(e) => tree_kind(e),
                IndexError::Store(e) => store_kind(e),
                IndexError::Ref(e) => ref_kind(e),
                IndexError::Diff(e) => diff_kind(e),
                IndexError::Conflicts(MergeError::Store(e)) => store_kind(e),
                IndexError::Conflicts(_) => ErrorKind::Internal,
            },
        }
    }
}

fn store_kind(e: &StoreError) -> ErrorKind {
    match e {
        StoreError::NotFound(_) => ErrorKind::NotFound,
        StoreError::HashMismatch { .. }
        | StoreError::CorruptObject { .. }
        | StoreError::UnexpectedKind { .. }
        | StoreError::Serialization(_) => ErrorKind::Integrity,
        StoreError::SchemaViolation { .. } | StoreError::NullObjectId => ErrorKind::InvalidArgument,
        StoreError::Io(_) | StoreError::LockPoisoned => ErrorKind::Internal,
    }
}

fn tree_kind(e: &TreeError) -> ErrorKind {
    match e {
        TreeError::MissingChild(_) | TreeError::Malformed { .. } | TreeError::DuplicateName(_) => {
            ErrorKind::Integrity
        }
        TreeError::NotATree(_) | TreeError::InvalidPath(_) => ErrorKind::InvalidArgument,
        TreeError::Store(e) => store_kind(e),
    }
}

fn ref_kind(e: &RefError) -> ErrorKind {
    match e {
        RefError::NotFound { .. } => ErrorKind::NotFound,
        RefError::AlreadyExists { .. }
        | RefError::TagImmutable { .. }
        | RefError::CasMismatch { .. } => ErrorKind::PreconditionFailed,
        RefError::InvalidName { .. } => ErrorKind::InvalidArgument,
        RefError::SymrefDepthExceeded { .. } => ErrorKind::Integrity,
        RefError::LockPoisoned => ErrorKind::Internal,
    }
}

fn dag_kind(e: &DagError) -> ErrorKind {
    match e {
        DagError::CommitNotFound(_) => ErrorKind::NotFound,
        DagError::DanglingParent { .. } => ErrorKind::Integrity,
        DagError::Store(e) => store_kind(e),
    }
}

fn diff_kind(e: &DiffError) -> ErrorKind {
    match e {
        DiffError::Cancelled => ErrorKind::Internal,
        DiffError::Tree(e) => tree_kind(e),
        DiffError::Store(e) => store_kind(e),
    }
}

/// Convenience alias for repository results.
pub type RepoResult<T> = Result<T, RepoError>;

#[cfg(test)]
mod tests {
    use super::*;
    use gvc_types::ObjectId;

    #[test]
    fn kinds_follow_the_source_error() {
        let id = ObjectId::from_bytes(b"x");
        assert_eq!(RepoError::from(StoreError::NotFound(id)).kind(), ErrorKind::NotFound);
        assert_eq!(RepoError::from(TreeError::MissingChild(id)).kind(), ErrorKind::Integrity);
        assert_eq!(
            RepoError::from(IndexError::Tree(TreeError::Store(StoreError::HashMismatch {
                id,
                computed: ObjectId::from_bytes(b"y"),
            })))
            .kind(),
            ErrorKind::Integrity
        );
        let cas = RefError::CasMismatch {
            name: "refs/heads/master".into(),
            expected: None,
            actual: None,
        };
        assert_eq!(RepoError::from(cas).kind(), ErrorKind::PreconditionFailed);
        assert_eq!(
            RepoError::from(CheckoutFailure::LocalChangesNotCommitted).kind(),
            ErrorKind::PreconditionFailed
        );
        assert_eq!(RepoError::Conflict(Vec::new()).kind(), ErrorKind::Conflict);
        assert_eq!(ErrorKind::InvalidArgument.to_string(), "invalid argument");
    }

    #[test]
    fn unmerged_paths_message_lists_paths() {
        let err = RepoError::UnmergedPaths(vec!["parks/1".into(), "roads/2".into()]);
        assert_eq!(err.to_string(), "unmerged paths: parks/1, roads/2");
    }
}
