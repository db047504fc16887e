//! Working tree status types.
//!
//! A status compares three trees: the commit at `HEAD`, the staging area
//! and the working tree. Conflicts left by a merge are reported alongside.

use std::fmt;

use gvc_diff::{ChangeType, DiffEntry};
use gvc_merge::Conflict;
use gvc_store::NodeKind;
use gvc_types::ObjectId;

/// Changes between `HEAD`, the staging area and the working tree.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WorkdirStatus {
    /// Staged changes, `HEAD` to staging area.
    pub staged: Vec<StatusEntry>,
    /// Unstaged changes, staging area to working tree.
    pub unstaged: Vec<StatusEntry>,
    /// Unresolved merge conflicts.
    pub conflicts: Vec<Conflict>,
}

impl WorkdirStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// No staged or unstaged changes and no conflicts.
    pub fn is_clean(&self) -> bool {
        self.staged.is_empty() && self.unstaged.is_empty() && self.conflicts.is_empty()
    }

    pub fn has_staged_changes(&self) -> bool {
        !self.staged.is_empty()
    }

    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }

    pub fn total_entries(&self) -> usize {
        self.staged.len() + self.unstaged.len() + self.conflicts.len()
    }
}

/// One changed path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusEntry {
    pub path: String,
    pub change: ChangeType,
    pub kind: NodeKind,
    /// Null when the path did not exist before.
    pub old_id: ObjectId,
    /// Null when the path no longer exists.
    pub new_id: ObjectId,
}

impl StatusEntry {
    pub fn from_diff(entry: &DiffEntry) -> Self {
        Self {
            path: entry.path(),
            change: entry.change_type(),
            kind: entry.kind(),
            old_id: entry.old_id(),
            new_id: entry.new_id(),
        }
    }
}

impl fmt::Display for StatusEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.change.code(), self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gvc_store::Node;
    use gvc_tree::NodeRef;

    fn feature(parent: &str, name: &str, tag: &[u8]) -> NodeRef {
        NodeRef::new(parent, Node::feature(name, ObjectId::from_bytes(tag), None, None))
    }

    #[test]
    fn entry_from_diff() {
        let added = StatusEntry::from_diff(&DiffEntry::added(feature("parks", "1", b"a")));
        assert_eq!(added.change, ChangeType::Added);
        assert_eq!(added.path, "parks/1");
        assert!(added.old_id.is_null());
        assert_eq!(added.to_string(), "A parks/1");

        let removed = StatusEntry::from_diff(&DiffEntry::removed(feature("parks", "2", b"b")));
        assert!(removed.new_id.is_null());
        assert_eq!(removed.kind, NodeKind::Feature);
    }

    #[test]
    fn clean_and_counts() {
        let mut status = WorkdirStatus::new();
        assert!(status.is_clean());
        status
            .unstaged
            .push(StatusEntry::from_diff(&DiffEntry::added(feature("", "x", b"x"))));
        assert!(!status.is_clean());
        assert!(!status.has_staged_changes());
        status.conflicts.push(Conflict::new(
            "x",
            ObjectId::null(),
            ObjectId::from_bytes(b"o"),
            ObjectId::from_bytes(b"t"),
        ));
        assert!(status.has_conflicts());
        assert_eq!(status.total_entries(), 2);
    }
}
