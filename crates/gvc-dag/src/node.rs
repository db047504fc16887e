//! Arena entries of the commit graph.

use gvc_store::RevCommit;
use gvc_types::ObjectId;

/// One commit as held by [`CommitGraph`](crate::CommitGraph).
///
/// Only the data graph walks need is kept; the full commit stays in the
/// object store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitNode {
    pub id: ObjectId,
    /// Parents in stored order; the first is the mainline.
    pub parents: Vec<ObjectId>,
    /// Committer timestamp in milliseconds.
    pub commit_time: i64,
    /// 1 for root commits, otherwise one more than the highest parent.
    pub generation: u64,
}

impl CommitNode {
    pub fn from_commit(id: ObjectId, commit: &RevCommit, generation: u64) -> Self {
        Self {
            id,
            parents: commit.parents.clone(),
            commit_time: commit.committer.timestamp,
            generation,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }
}
