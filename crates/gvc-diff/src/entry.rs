//! Diff entries and summaries.

use std::fmt;

use gvc_store::NodeKind;
use gvc_tree::NodeRef;
use gvc_types::ObjectId;

/// Kind of change a [`DiffEntry`] describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChangeType {
    Added,
    Modified,
    Removed,
}

impl ChangeType {
    /// Single-letter code, as shown in status listings.
    pub fn code(self) -> char {
        match self {
            ChangeType::Added => 'A',
            ChangeType::Modified => 'M',
            ChangeType::Removed => 'D',
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeType::Added => write!(f, "ADDED"),
            ChangeType::Modified => write!(f, "MODIFIED"),
            ChangeType::Removed => write!(f, "REMOVED"),
        }
    }
}

/// One changed path between two trees.
///
/// At least one side is always present. A node whose object id is the same
/// but whose metadata or envelope differs counts as modified.
#[derive(Clone, Debug, PartialEq)]
pub struct DiffEntry {
    pub old: Option<NodeRef>,
    pub new: Option<NodeRef>,
}

impl DiffEntry {
    pub fn added(new: NodeRef) -> Self {
        Self {
            old: None,
            new: Some(new),
        }
    }

    pub fn removed(old: NodeRef) -> Self {
        Self {
            old: Some(old),
            new: None,
        }
    }

    pub fn modified(old: NodeRef, new: NodeRef) -> Self {
        Self {
            old: Some(old),
            new: Some(new),
        }
    }

    pub fn change_type(&self) -> ChangeType {
        match (&self.old, &self.new) {
            (None, _) => ChangeType::Added,
            (_, None) => ChangeType::Removed,
            _ => ChangeType::Modified,
        }
    }

    /// Path of the changed node, from whichever side is present.
    pub fn path(&self) -> String {
        self.side().map(NodeRef::path).unwrap_or_default()
    }

    pub fn kind(&self) -> NodeKind {
        self.side().map(NodeRef::kind).unwrap_or(NodeKind::Feature)
    }

    pub fn is_tree(&self) -> bool {
        self.kind() == NodeKind::Tree
    }

    pub fn old_id(&self) -> ObjectId {
        self.old.as_ref().map(NodeRef::object_id).unwrap_or_else(ObjectId::null)
    }

    pub fn new_id(&self) -> ObjectId {
        self.new.as_ref().map(NodeRef::object_id).unwrap_or_else(ObjectId::null)
    }

    fn side(&self) -> Option<&NodeRef> {
        self.new.as_ref().or(self.old.as_ref())
    }
}

impl fmt::Display for DiffEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {}",
            self.change_type().code(),
            self.kind(),
            self.old_id().short_hex(),
            self.new_id().short_hex(),
            self.path()
        )
    }
}

/// Counts of changes by type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DiffSummary {
    pub added: usize,
    pub modified: usize,
    pub removed: usize,
}

impl DiffSummary {
    pub fn from_entries<'e>(entries: impl IntoIterator<Item = &'e DiffEntry>) -> Self {
        let mut summary = Self::default();
        for entry in entries {
            summary.record(entry);
        }
        summary
    }

    pub fn record(&mut self, entry: &DiffEntry) {
        match entry.change_type() {
            ChangeType::Added => self.added += 1,
            ChangeType::Modified => self.modified += 1,
            ChangeType::Removed => self.removed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.added + self.modified + self.removed
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

impl fmt::Display for DiffSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} added, {} modified, {} removed",
            self.added, self.modified, self.removed
        )
    }
}
