use std::fmt;

use gvc_store::{Node, NodeKind};
use gvc_types::ObjectId;

use crate::path;

/// A node together with the path of the tree level that holds it.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeRef {
    pub parent_path: String,
    pub node: Node,
}

impl NodeRef {
    pub fn new(parent_path: impl Into<String>, node: Node) -> Self {
        Self {
            parent_path: parent_path.into(),
            node,
        }
    }

    /// Full path: `parent/name`.
    pub fn path(&self) -> String {
        path::join(&self.parent_path, &self.node.name)
    }

    pub fn name(&self) -> &str {
        &self.node.name
    }

    pub fn kind(&self) -> NodeKind {
        self.node.kind
    }

    pub fn object_id(&self) -> ObjectId {
        self.node.object_id
    }

    pub fn metadata_id(&self) -> Option<ObjectId> {
        self.node.metadata_id
    }

    pub fn is_tree(&self) -> bool {
        self.node.is_tree()
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.node.kind,
            self.node.object_id.short_hex(),
            self.path()
        )
    }
}
