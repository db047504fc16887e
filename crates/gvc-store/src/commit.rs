use serde::{Deserialize, Serialize};
use gvc_types::{ObjectId, Person};

use crate::error::StoreResult;
use crate::object::{decode, encode, ObjectKind, StoredObject};

/// An immutable snapshot: a root tree and the commits it descends from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevCommit {
    pub tree_id: ObjectId,
    /// Empty for a root commit, two or more for a merge.
    pub parents: Vec<ObjectId>,
    pub author: Person,
    pub committer: Person,
    pub message: String,
}

impl RevCommit {
    pub fn new(
        tree_id: ObjectId,
        parents: Vec<ObjectId>,
        author: Person,
        committer: Person,
        message: impl Into<String>,
    ) -> Self {
        Self {
            tree_id,
            parents,
            author,
            committer,
            message: message.into(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }

    pub fn first_parent(&self) -> Option<ObjectId> {
        self.parents.first().copied()
    }

    /// First line of the message.
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }

    pub fn to_stored_object(&self) -> StoreResult<StoredObject> {
        encode(ObjectKind::Commit, self)
    }

    pub fn from_stored_object(obj: &StoredObject) -> StoreResult<Self> {
        decode(obj, ObjectKind::Commit)
    }
}

/// Annotated tag pointing at a commit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevTag {
    pub name: String,
    pub target: ObjectId,
    pub message: String,
    pub tagger: Person,
}

impl RevTag {
    pub fn new(
        name: impl Into<String>,
        target: ObjectId,
        message: impl Into<String>,
        tagger: Person,
    ) -> Self {
        Self {
            name: name.into(),
            target,
            message: message.into(),
            tagger,
        }
    }

    pub fn to_stored_object(&self) -> StoreResult<StoredObject> {
        encode(ObjectKind::Tag, self)
    }

    pub fn from_stored_object(obj: &StoredObject) -> StoreResult<Self> {
        decode(obj, ObjectKind::Tag)
    }
}
