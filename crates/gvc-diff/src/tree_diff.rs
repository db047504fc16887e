//! Tree-level diff: walk two revision trees side by side and report changed
//! paths.
//!
//! The walk is top-down and lazy. Sub-trees or buckets with the same id on
//! both sides are skipped without being read, so the cost is proportional to
//! the size of the change rather than the size of the trees.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use gvc_store::{Node, ObjectStore};
use gvc_tree::{bucket_index, path, NodeRef, TreeConfig, TreeEditor};
use gvc_types::ObjectId;
use tracing::debug;

use crate::entry::DiffEntry;
use crate::error::{DiffError, DiffResult};

/// Builder for a diff between two root trees.
///
/// Each call to [`iter`](DiffTree::iter) starts a fresh traversal.
#[derive(Clone)]
pub struct DiffTree<'a> {
    store: &'a dyn ObjectStore,
    old: ObjectId,
    new: ObjectId,
    report_trees: bool,
    filters: Vec<String>,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'a> DiffTree<'a> {
    /// Diff `old` against `new`. The null id stands for an empty tree.
    pub fn new(store: &'a dyn ObjectStore, old: ObjectId, new: ObjectId) -> Self {
        Self {
            store,
            old,
            new,
            report_trees: false,
            filters: Vec::new(),
            cancel: None,
        }
    }

    /// Also emit entries for changed tree nodes, before their contents.
    pub fn report_trees(mut self, report: bool) -> Self {
        self.report_trees = report;
        self
    }

    /// Restrict output to entries at or under any of `paths`.
    pub fn filter<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<str>,
    {
        self.filters.extend(
            paths
                .into_iter()
                .map(|p| p.as_ref().trim_matches(path::SEPARATOR).to_string()),
        );
        // An empty filter path selects everything.
        if self.filters.iter().any(String::is_empty) {
            self.filters.clear();
        }
        self
    }

    /// Abort the traversal with [`DiffError::Cancelled`] once `flag` is set.
    pub fn cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn iter(&self) -> DiffIter<'a> {
        let root = Work::Level {
            parent: String::new(),
            old: Side::stored(self.old),
            new: Side::stored(self.new),
            depth: 0,
        };
        DiffIter {
            editor: TreeEditor::new(self.store, TreeConfig::default()),
            report_trees: self.report_trees,
            filters: self.filters.clone(),
            cancel: self.cancel.clone(),
            stack: vec![root],
            emitted: 0,
            done: false,
        }
    }

    /// Run the traversal to completion.
    pub fn collect_entries(&self) -> DiffResult<Vec<DiffEntry>> {
        self.iter().collect()
    }
}

impl<'a> IntoIterator for &DiffTree<'a> {
    type Item = DiffResult<DiffEntry>;
    type IntoIter = DiffIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Feature-level changes between two root trees.
pub fn diff_trees(
    store: &dyn ObjectStore,
    old: &ObjectId,
    new: &ObjectId,
) -> DiffResult<Vec<DiffEntry>> {
    DiffTree::new(store, *old, *new).collect_entries()
}

/// Contents of one side of a level comparison.
enum Side {
    Absent,
    Stored(ObjectId),
    /// Part of a leaf that was split by bucket index to line up with a
    /// bucketed level on the other side.
    Entries(Vec<Node>),
}

impl Side {
    fn stored(id: ObjectId) -> Self {
        if id.is_null() {
            Side::Absent
        } else {
            Side::Stored(id)
        }
    }

    fn from_bucket(id: Option<ObjectId>) -> Self {
        id.map(Side::Stored).unwrap_or(Side::Absent)
    }

    fn from_entries(entries: Option<Vec<Node>>) -> Self {
        entries.map(Side::Entries).unwrap_or(Side::Absent)
    }
}

enum View {
    Leaf(Vec<Node>),
    Buckets(BTreeMap<u32, ObjectId>),
}

enum Work {
    Emit(DiffEntry),
    /// Compare one logical level, or a bucket of it at `depth`.
    Level {
        parent: String,
        old: Side,
        new: Side,
        depth: usize,
    },
}

/// Lazy traversal produced by [`DiffTree::iter`].
pub struct DiffIter<'a> {
    editor: TreeEditor<'a>,
    report_trees: bool,
    filters: Vec<String>,
    cancel: Option<Arc<AtomicBool>>,
    stack: Vec<Work>,
    emitted: usize,
    done: bool,
}

impl DiffIter<'_> {
    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// Whether an entry at `p` is reported.
    fn selects(&self, p: &str) -> bool {
        self.filters.is_empty() || self.filters.iter().any(|f| path::is_at_or_under(p, f))
    }

    /// Whether anything at or below the tree at `p` can be reported.
    fn reaches(&self, p: &str) -> bool {
        self.filters.is_empty()
            || self
                .filters
                .iter()
                .any(|f| path::is_at_or_under(p, f) || path::is_ancestor_of(p, f))
    }

    fn view(&self, side: Side) -> DiffResult<View> {
        Ok(match side {
            Side::Absent => View::Leaf(Vec::new()),
            Side::Entries(nodes) => View::Leaf(nodes),
            Side::Stored(id) => {
                let tree = self.editor.load(&id)?;
                if tree.is_bucketed() {
                    View::Buckets(tree.buckets.iter().map(|(i, b)| (*i, b.tree_id)).collect())
                } else {
                    let mut nodes = tree.trees;
                    nodes.extend(tree.features);
                    nodes.sort_by(|a, b| a.name.cmp(&b.name));
                    View::Leaf(nodes)
                }
            }
        })
    }

    /// Expand one level comparison into follow-up work, in output order.
    fn expand(&self, parent: String, old: Side, new: Side, depth: usize) -> DiffResult<Vec<Work>> {
        if let (Side::Stored(a), Side::Stored(b)) = (&old, &new) {
            if a == b {
                return Ok(Vec::new());
            }
        }
        let mut work = Vec::new();
        match (self.view(old)?, self.view(new)?) {
            (View::Buckets(o), View::Buckets(n)) => {
                let indexes: BTreeSet<u32> = o.keys().chain(n.keys()).copied().collect();
                for i in indexes {
                    work.push(Work::Level {
                        parent: parent.clone(),
                        old: Side::from_bucket(o.get(&i).copied()),
                        new: Side::from_bucket(n.get(&i).copied()),
                        depth: depth + 1,
                    });
                }
            }
            (View::Buckets(o), View::Leaf(n)) => {
                let mut groups = partition(n, depth);
                let indexes: BTreeSet<u32> = o.keys().chain(groups.keys()).copied().collect();
                for i in indexes {
                    work.push(Work::Level {
                        parent: parent.clone(),
                        old: Side::from_bucket(o.get(&i).copied()),
                        new: Side::from_entries(groups.remove(&i)),
                        depth: depth + 1,
                    });
                }
            }
            (View::Leaf(o), View::Buckets(n)) => {
                let mut groups = partition(o, depth);
                let indexes: BTreeSet<u32> = groups.keys().chain(n.keys()).copied().collect();
                for i in indexes {
                    work.push(Work::Level {
                        parent: parent.clone(),
                        old: Side::from_entries(groups.remove(&i)),
                        new: Side::from_bucket(n.get(&i).copied()),
                        depth: depth + 1,
                    });
                }
            }
            (View::Leaf(o), View::Leaf(n)) => self.compare_leaves(&parent, o, n, &mut work),
        }
        Ok(work)
    }

    fn compare_leaves(&self, parent: &str, old: Vec<Node>, new: Vec<Node>, work: &mut Vec<Work>) {
        let mut old = old.into_iter().peekable();
        let mut new = new.into_iter().peekable();
        loop {
            let order = match (old.peek(), new.peek()) {
                (None, None) => break,
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (Some(a), Some(b)) => a.name.cmp(&b.name),
            };
            let (a, b) = match order {
                std::cmp::Ordering::Less => (old.next(), None),
                std::cmp::Ordering::Greater => (None, new.next()),
                std::cmp::Ordering::Equal => (old.next(), new.next()),
            };
            self.compare_nodes(parent, a, b, work);
        }
    }

    fn compare_nodes(&self, parent: &str, old: Option<Node>, new: Option<Node>, work: &mut Vec<Work>) {
        match (old, new) {
            (Some(a), Some(b)) if a == b => {}
            (Some(a), Some(b)) if a.is_tree() && b.is_tree() => {
                let p = path::join(parent, &a.name);
                if !self.reaches(&p) {
                    return;
                }
                let (old_id, new_id) = (a.object_id, b.object_id);
                self.push_tree(
                    work,
                    &p,
                    DiffEntry::modified(NodeRef::new(parent, a), NodeRef::new(parent, b)),
                );
                if old_id != new_id {
                    work.push(Work::Level {
                        parent: p,
                        old: Side::Stored(old_id),
                        new: Side::Stored(new_id),
                        depth: 0,
                    });
                }
            }
            (Some(a), Some(b)) if a.is_feature() && b.is_feature() => {
                self.push_feature(
                    work,
                    DiffEntry::modified(NodeRef::new(parent, a), NodeRef::new(parent, b)),
                );
            }
            // Kind changed: report as a removal followed by an addition.
            (Some(a), Some(b)) => {
                self.compare_nodes(parent, Some(a), None, work);
                self.compare_nodes(parent, None, Some(b), work);
            }
            (Some(a), None) => {
                if a.is_tree() {
                    let p = path::join(parent, &a.name);
                    if !self.reaches(&p) {
                        return;
                    }
                    let id = a.object_id;
                    self.push_tree(work, &p, DiffEntry::removed(NodeRef::new(parent, a)));
                    work.push(Work::Level {
                        parent: p,
                        old: Side::Stored(id),
                        new: Side::Absent,
                        depth: 0,
                    });
                } else {
                    self.push_feature(work, DiffEntry::removed(NodeRef::new(parent, a)));
                }
            }
            (None, Some(b)) => {
                if b.is_tree() {
                    let p = path::join(parent, &b.name);
                    if !self.reaches(&p) {
                        return;
                    }
                    let id = b.object_id;
                    self.push_tree(work, &p, DiffEntry::added(NodeRef::new(parent, b)));
                    work.push(Work::Level {
                        parent: p,
                        old: Side::Absent,
                        new: Side::Stored(id),
                        depth: 0,
                    });
                } else {
                    self.push_feature(work, DiffEntry::added(NodeRef::new(parent, b)));
                }
            }
            (None, None) => {}
        }
    }

    fn push_tree(&self, work: &mut Vec<Work>, p: &str, entry: DiffEntry) {
        if self.report_trees && self.selects(p) {
            work.push(Work::Emit(entry));
        }
    }

    fn push_feature(&self, work: &mut Vec<Work>, entry: DiffEntry) {
        if self.selects(&entry.path()) {
            work.push(Work::Emit(entry));
        }
    }

    fn fail(&mut self, err: DiffError) -> Option<DiffResult<DiffEntry>> {
        self.done = true;
        self.stack.clear();
        Some(Err(err))
    }
}

impl Iterator for DiffIter<'_> {
    type Item = DiffResult<DiffEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        while let Some(work) = self.stack.pop() {
            match work {
                Work::Emit(entry) => {
                    self.emitted += 1;
                    return Some(Ok(entry));
                }
                Work::Level {
                    parent,
                    old,
                    new,
                    depth,
                } => {
                    if self.cancelled() {
                        debug!(emitted = self.emitted, "diff cancelled");
                        return self.fail(DiffError::Cancelled);
                    }
                    match self.expand(parent, old, new, depth) {
                        Ok(work) => self.stack.extend(work.into_iter().rev()),
                        Err(err) => return self.fail(err),
                    }
                }
            }
        }
        self.done = true;
        debug!(emitted = self.emitted, "diff complete");
        None
    }
}

/// Split leaf entries by their bucket index at `depth`.
fn partition(nodes: Vec<Node>, depth: usize) -> BTreeMap<u32, Vec<Node>> {
    let mut groups: BTreeMap<u32, Vec<Node>> = BTreeMap::new();
    for node in nodes {
        groups.entry(bucket_index(&node.name, depth)).or_default().push(node);
    }
    groups
}
