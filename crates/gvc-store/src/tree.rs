use std::collections::BTreeMap;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use gvc_types::{Envelope, ObjectId};

use crate::error::StoreResult;
use crate::object::{decode, encode, ObjectKind, StoredObject};

/// Whether a node points at a sub-tree or a feature.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Tree,
    Feature,
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tree => write!(f, "tree"),
            Self::Feature => write!(f, "feature"),
        }
    }
}

/// A named entry inside one tree level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub kind: NodeKind,
    pub object_id: ObjectId,
    /// Feature type of a feature, or default feature type of a typed tree.
    pub metadata_id: Option<ObjectId>,
    pub envelope: Option<Envelope>,
}

impl Node {
    pub fn tree(name: impl Into<String>, object_id: ObjectId, metadata_id: Option<ObjectId>) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::Tree,
            object_id,
            metadata_id,
            envelope: None,
        }
    }

    pub fn feature(
        name: impl Into<String>,
        object_id: ObjectId,
        metadata_id: Option<ObjectId>,
        envelope: Option<Envelope>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::Feature,
            object_id,
            metadata_id,
            envelope,
        }
    }

    pub fn is_tree(&self) -> bool {
        self.kind == NodeKind::Tree
    }

    pub fn is_feature(&self) -> bool {
        self.kind == NodeKind::Feature
    }

    pub fn with_envelope(mut self, envelope: Option<Envelope>) -> Self {
        self.envelope = envelope;
        self
    }
}

/// Reference from a bucketed level to the sub-tree holding one hash bucket.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    pub tree_id: ObjectId,
    pub envelope: Option<Envelope>,
}

/// One logical tree level.
///
/// A leaf keeps its `trees` and `features` sorted by name. A bucketed level
/// keeps them empty and instead maps bucket indexes to sub-trees, each holding
/// the entries of this level whose name hash selects that bucket. The counts
/// always describe the whole logical level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RevTree {
    /// Features contained recursively, including under sub-trees.
    pub size: u64,
    pub tree_count: u64,
    pub feature_count: u64,
    pub trees: Vec<Node>,
    pub features: Vec<Node>,
    pub buckets: BTreeMap<u32, Bucket>,
    pub envelope: Option<Envelope>,
}

impl RevTree {
    /// The tree with no entries.
    pub fn empty() -> Self {
        Self {
            size: 0,
            tree_count: 0,
            feature_count: 0,
            trees: Vec::new(),
            features: Vec::new(),
            buckets: BTreeMap::new(),
            envelope: None,
        }
    }

    /// Well-known id of the empty tree.
    pub fn empty_id() -> ObjectId {
        static EMPTY: OnceLock<ObjectId> = OnceLock::new();
        *EMPTY.get_or_init(|| {
            // The empty tree always encodes, an error here is unreachable.
            RevTree::empty()
                .to_stored_object()
                .map(|o| o.compute_id())
                .unwrap_or_else(|_| ObjectId::null())
        })
    }

    /// Build a leaf from unsorted node lists. `size` must already account
    /// for features held by sub-trees.
    pub fn leaf(mut trees: Vec<Node>, mut features: Vec<Node>, size: u64) -> Self {
        trees.sort_by(|a, b| a.name.cmp(&b.name));
        features.sort_by(|a, b| a.name.cmp(&b.name));
        let envelope = trees
            .iter()
            .chain(features.iter())
            .filter_map(|n| n.envelope)
            .reduce(|acc, e| acc.union(&e));
        Self {
            size,
            tree_count: trees.len() as u64,
            feature_count: features.len() as u64,
            trees,
            features,
            buckets: BTreeMap::new(),
            envelope,
        }
    }

    /// Build a bucketed level.
    pub fn bucketed(
        buckets: BTreeMap<u32, Bucket>,
        size: u64,
        tree_count: u64,
        feature_count: u64,
    ) -> Self {
        let envelope = buckets
            .values()
            .filter_map(|b| b.envelope)
            .reduce(|acc, e| acc.union(&e));
        Self {
            size,
            tree_count,
            feature_count,
            trees: Vec::new(),
            features: Vec::new(),
            buckets,
            envelope,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.num_entries() == 0
    }

    pub fn is_bucketed(&self) -> bool {
        !self.buckets.is_empty()
    }

    /// Entries at this logical level, across all buckets.
    pub fn num_entries(&self) -> u64 {
        self.tree_count + self.feature_count
    }

    /// Direct (leaf) child with the given name.
    pub fn leaf_child(&self, name: &str) -> Option<&Node> {
        search(&self.trees, name).or_else(|| search(&self.features, name))
    }

    /// Leaf entries merged into one name-ordered list.
    pub fn leaf_entries(&self) -> Vec<&Node> {
        let mut all: Vec<&Node> = self.trees.iter().chain(self.features.iter()).collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    pub fn to_stored_object(&self) -> StoreResult<StoredObject> {
        encode(ObjectKind::Tree, self)
    }

    pub fn from_stored_object(obj: &StoredObject) -> StoreResult<Self> {
        decode(obj, ObjectKind::Tree)
    }
}

fn search<'a>(nodes: &'a [Node], name: &str) -> Option<&'a Node> {
    nodes
        .binary_search_by(|n| n.name.as_str().cmp(name))
        .ok()
        .map(|i| &nodes[i])
}

impl Default for RevTree {
    fn default() -> Self {
        Self::empty()
    }
}
