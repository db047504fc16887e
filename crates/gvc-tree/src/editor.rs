use std::collections::{BTreeMap, HashSet};

use gvc_store::{Bucket, Node, NodeKind, ObjectStore, ObjectStoreExt, RevTree, StoreError};
use gvc_types::ObjectId;
use tracing::debug;

use crate::bucket::{bucket_index, TreeConfig, MAX_DEPTH};
use crate::error::{TreeError, TreeResult};
use crate::node::NodeRef;
use crate::path;

/// Reads and rewrites revision trees in an object store.
///
/// Every edit produces new tree objects and leaves the old ones untouched;
/// unchanged sub-trees and buckets are shared by id. A level holding more
/// than `normalized_size_limit` entries is split into hash buckets, and a
/// bucketed level that shrinks back to the limit collapses into a leaf, so
/// the shape of a tree depends only on its set of entries.
pub struct TreeEditor<'a> {
    store: &'a dyn ObjectStore,
    config: TreeConfig,
}

impl<'a> TreeEditor<'a> {
    pub fn new(store: &'a dyn ObjectStore, config: TreeConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &'a dyn ObjectStore {
        self.store
    }

    pub fn config(&self) -> TreeConfig {
        self.config
    }

    fn limit(&self) -> usize {
        self.config.normalized_size_limit
    }

    /// Load a tree, treating an absent id as a broken structure.
    pub fn load(&self, id: &ObjectId) -> TreeResult<RevTree> {
        let tree = match self.store.get_tree(id) {
            Err(StoreError::NotFound(_)) => return Err(TreeError::MissingChild(*id)),
            other => other?,
        };
        if tree.is_bucketed() && (!tree.trees.is_empty() || !tree.features.is_empty()) {
            return Err(TreeError::Malformed {
                id: *id,
                reason: "bucketed tree also holds direct entries".into(),
            });
        }
        Ok(tree)
    }

    pub fn write(&self, tree: &RevTree) -> TreeResult<ObjectId> {
        Ok(self.store.put_tree(tree)?)
    }

    /// Features a node contributes to its parent's recursive size.
    fn contribution(&self, node: &Node) -> TreeResult<u64> {
        match node.kind {
            NodeKind::Feature => Ok(1),
            NodeKind::Tree if node.object_id == RevTree::empty_id() => Ok(0),
            NodeKind::Tree => Ok(self.load(&node.object_id)?.size),
        }
    }

    // -----------------------------------------------------------------------
    // Reading
    // -----------------------------------------------------------------------

    /// Child of this level called `name`, descending through buckets.
    pub fn find_child(&self, tree: &RevTree, name: &str) -> TreeResult<Option<Node>> {
        self.find_at(tree, name, 0)
    }

    fn find_at(&self, tree: &RevTree, name: &str, depth: usize) -> TreeResult<Option<Node>> {
        if !tree.is_bucketed() {
            return Ok(tree.leaf_child(name).cloned());
        }
        match tree.buckets.get(&bucket_index(name, depth)) {
            None => Ok(None),
            Some(bucket) => {
                let child = self.load(&bucket.tree_id)?;
                self.find_at(&child, name, depth + 1)
            }
        }
    }

    /// Resolve a slash-separated path below `root`.
    pub fn lookup(&self, root: &ObjectId, path: &str) -> TreeResult<Option<NodeRef>> {
        let segs = path::segments(path)?;
        let Some((name, parents)) = segs.split_last() else {
            return Err(TreeError::InvalidPath(path.to_string()));
        };
        let mut tree = self.load(root)?;
        let mut parent = String::new();
        for seg in parents {
            match self.find_child(&tree, seg)? {
                Some(node) if node.is_tree() => tree = self.load(&node.object_id)?,
                _ => return Ok(None),
            }
            parent = path::join(&parent, seg);
        }
        Ok(self
            .find_child(&tree, name)?
            .map(|node| NodeRef::new(parent, node)))
    }

    /// Id of the tree at `path`; the empty path is `root` itself.
    pub fn subtree_id(&self, root: &ObjectId, path: &str) -> TreeResult<Option<ObjectId>> {
        if path.is_empty() {
            return Ok(Some(*root));
        }
        Ok(self
            .lookup(root, path)?
            .filter(NodeRef::is_tree)
            .map(|r| r.object_id()))
    }

    /// All entries of one logical level, flattened across buckets and sorted
    /// by name.
    pub fn children(&self, tree: &RevTree) -> TreeResult<Vec<Node>> {
        let mut out = Vec::with_capacity(tree.num_entries() as usize);
        self.collect_level(tree, &mut out)?;
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    fn collect_level(&self, tree: &RevTree, out: &mut Vec<Node>) -> TreeResult<()> {
        if !tree.is_bucketed() {
            out.extend(tree.trees.iter().cloned());
            out.extend(tree.features.iter().cloned());
            return Ok(());
        }
        for bucket in tree.buckets.values() {
            let child = self.load(&bucket.tree_id)?;
            self.collect_level(&child, out)?;
        }
        Ok(())
    }

    /// Depth-first walk of everything below `root`, trees in pre-order when
    /// `include_trees` is set.
    pub fn walk(&self, root: &ObjectId, include_trees: bool) -> TreeResult<Vec<NodeRef>> {
        let mut out = Vec::new();
        self.walk_level(root, "", include_trees, &mut out)?;
        Ok(out)
    }

    /// Like [`walk`](Self::walk) but restricted to `path` and what lies
    /// beneath it.
    pub fn walk_path(
        &self,
        root: &ObjectId,
        path: &str,
        include_trees: bool,
    ) -> TreeResult<Vec<NodeRef>> {
        if path.is_empty() {
            return self.walk(root, include_trees);
        }
        let Some(start) = self.lookup(root, path)? else {
            return Ok(Vec::new());
        };
        if !start.is_tree() {
            return Ok(vec![start]);
        }
        let mut out = Vec::new();
        let id = start.object_id();
        if include_trees {
            out.push(start);
        }
        self.walk_level(&id, path, include_trees, &mut out)?;
        Ok(out)
    }

    fn walk_level(
        &self,
        id: &ObjectId,
        parent: &str,
        include_trees: bool,
        out: &mut Vec<NodeRef>,
    ) -> TreeResult<()> {
        let tree = self.load(id)?;
        for node in self.children(&tree)? {
            if node.is_tree() {
                let child_id = node.object_id;
                let child_path = path::join(parent, &node.name);
                if include_trees {
                    out.push(NodeRef::new(parent, node));
                }
                self.walk_level(&child_id, &child_path, include_trees, out)?;
            } else {
                out.push(NodeRef::new(parent, node));
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Single-level edits
    // -----------------------------------------------------------------------

    /// Insert or replace `node` in one level. Bucket sub-trees are written;
    /// the returned level itself is not. Also returns the replaced node.
    pub fn put(&self, tree: &RevTree, node: Node) -> TreeResult<(RevTree, Option<Node>)> {
        self.put_at(tree, node, 0)
    }

    fn put_at(
        &self,
        tree: &RevTree,
        node: Node,
        depth: usize,
    ) -> TreeResult<(RevTree, Option<Node>)> {
        if !tree.is_bucketed() {
            let mut trees = tree.trees.clone();
            let mut features = tree.features.clone();
            let old = take_named(&mut trees, &node.name)
                .or_else(|| take_named(&mut features, &node.name));
            let removed = match &old {
                Some(old) => self.contribution(old)?,
                None => 0,
            };
            let size = tree.size.saturating_sub(removed) + self.contribution(&node)?;
            match node.kind {
                NodeKind::Tree => trees.push(node),
                NodeKind::Feature => features.push(node),
            }
            if trees.len() + features.len() > self.limit() && depth < MAX_DEPTH {
                trees.append(&mut features);
                return Ok((self.build_level(trees, depth)?, old));
            }
            return Ok((RevTree::leaf(trees, features, size), old));
        }

        let idx = bucket_index(&node.name, depth);
        let child = match tree.buckets.get(&idx) {
            Some(bucket) => self.load(&bucket.tree_id)?,
            None => RevTree::empty(),
        };
        let (mut tree_count, mut feature_count) = (tree.tree_count, tree.feature_count);
        match node.kind {
            NodeKind::Tree => tree_count += 1,
            NodeKind::Feature => feature_count += 1,
        }
        let (new_child, old) = self.put_at(&child, node, depth + 1)?;
        if let Some(old) = &old {
            match old.kind {
                NodeKind::Tree => tree_count -= 1,
                NodeKind::Feature => feature_count -= 1,
            }
        }
        let size = tree.size.saturating_sub(child.size) + new_child.size;
        let mut buckets = tree.buckets.clone();
        buckets.insert(
            idx,
            Bucket {
                tree_id: self.write(&new_child)?,
                envelope: new_child.envelope,
            },
        );
        Ok((
            RevTree::bucketed(buckets, size, tree_count, feature_count),
            old,
        ))
    }

    /// Remove the entry called `name` from one level, collapsing buckets back
    /// into a leaf when the level shrinks to the limit.
    pub fn remove(&self, tree: &RevTree, name: &str) -> TreeResult<(RevTree, Option<Node>)> {
        self.remove_at(tree, name, 0)
    }

    fn remove_at(
        &self,
        tree: &RevTree,
        name: &str,
        depth: usize,
    ) -> TreeResult<(RevTree, Option<Node>)> {
        if !tree.is_bucketed() {
            let mut trees = tree.trees.clone();
            let mut features = tree.features.clone();
            let Some(old) = take_named(&mut trees, name).or_else(|| take_named(&mut features, name))
            else {
                return Ok((tree.clone(), None));
            };
            let size = tree.size.saturating_sub(self.contribution(&old)?);
            return Ok((RevTree::leaf(trees, features, size), Some(old)));
        }

        let idx = bucket_index(name, depth);
        let Some(bucket) = tree.buckets.get(&idx) else {
            return Ok((tree.clone(), None));
        };
        let child = self.load(&bucket.tree_id)?;
        let (new_child, removed) = self.remove_at(&child, name, depth + 1)?;
        let Some(old) = removed else {
            return Ok((tree.clone(), None));
        };
        let (mut tree_count, mut feature_count) = (tree.tree_count, tree.feature_count);
        match old.kind {
            NodeKind::Tree => tree_count -= 1,
            NodeKind::Feature => feature_count -= 1,
        }
        let size = tree.size.saturating_sub(child.size) + new_child.size;
        let mut buckets = tree.buckets.clone();
        if new_child.is_empty() {
            buckets.remove(&idx);
        } else {
            buckets.insert(
                idx,
                Bucket {
                    tree_id: self.write(&new_child)?,
                    envelope: new_child.envelope,
                },
            );
        }
        let shrunk = RevTree::bucketed(buckets, size, tree_count, feature_count);
        if (tree_count + feature_count) as usize > self.limit() {
            return Ok((shrunk, Some(old)));
        }
        let mut entries = Vec::new();
        self.collect_level(&shrunk, &mut entries)?;
        let (trees, features): (Vec<Node>, Vec<Node>) =
            entries.into_iter().partition(Node::is_tree);
        Ok((RevTree::leaf(trees, features, size), Some(old)))
    }

    // -----------------------------------------------------------------------
    // Bulk build
    // -----------------------------------------------------------------------

    /// Canonical level for an arbitrary set of entries. Sub-trees are written,
    /// the returned level is not.
    pub fn build(&self, entries: Vec<Node>) -> TreeResult<RevTree> {
        let mut seen = HashSet::with_capacity(entries.len());
        for node in &entries {
            if !seen.insert(node.name.as_str()) {
                return Err(TreeError::DuplicateName(node.name.clone()));
            }
        }
        self.build_level(entries, 0)
    }

    fn build_level(&self, entries: Vec<Node>, depth: usize) -> TreeResult<RevTree> {
        if entries.len() <= self.limit() || depth >= MAX_DEPTH {
            let mut size = 0;
            for node in &entries {
                size += self.contribution(node)?;
            }
            let (trees, features): (Vec<Node>, Vec<Node>) =
                entries.into_iter().partition(Node::is_tree);
            return Ok(RevTree::leaf(trees, features, size));
        }

        let tree_count = entries.iter().filter(|n| n.is_tree()).count() as u64;
        let feature_count = entries.len() as u64 - tree_count;
        let mut groups: BTreeMap<u32, Vec<Node>> = BTreeMap::new();
        for node in entries {
            groups
                .entry(bucket_index(&node.name, depth))
                .or_default()
                .push(node);
        }
        let mut buckets = BTreeMap::new();
        let mut size = 0;
        for (idx, group) in groups {
            let child = self.build_level(group, depth + 1)?;
            size += child.size;
            buckets.insert(
                idx,
                Bucket {
                    tree_id: self.write(&child)?,
                    envelope: child.envelope,
                },
            );
        }
        Ok(RevTree::bucketed(buckets, size, tree_count, feature_count))
    }

    // -----------------------------------------------------------------------
    // Path edits
    // -----------------------------------------------------------------------

    /// Set (`Some`) or remove (`None`) the node at `path` and rewrite every
    /// ancestor up to a new root, which is written and returned.
    ///
    /// Missing intermediate trees are created when setting. Removing a path
    /// that does not exist returns `root` unchanged. The node is renamed to
    /// the last path component.
    pub fn update(&self, root: &ObjectId, path: &str, node: Option<Node>) -> TreeResult<ObjectId> {
        let segs = path::segments(path)?;
        let Some((name, parents)) = segs.split_last() else {
            return Err(TreeError::InvalidPath(path.to_string()));
        };

        let mut levels: Vec<(RevTree, Node)> = Vec::with_capacity(parents.len());
        let mut current = self.load(root)?;
        let mut walked = String::new();
        for seg in parents {
            walked = path::join(&walked, seg);
            let link = match self.find_child(&current, seg)? {
                Some(n) if n.is_tree() => n,
                Some(_) => return Err(TreeError::NotATree(walked)),
                None if node.is_none() => return Ok(*root),
                None => Node::tree(*seg, RevTree::empty_id(), None),
            };
            let next = self.load(&link.object_id)?;
            levels.push((current, link));
            current = next;
        }

        let mut rewritten = match node {
            Some(mut node) => {
                node.name = name.to_string();
                self.put(&current, node)?.0
            }
            None => match self.remove(&current, name)? {
                (_, None) => return Ok(*root),
                (tree, Some(_)) => tree,
            },
        };
        while let Some((parent, mut link)) = levels.pop() {
            link.object_id = self.write(&rewritten)?;
            link.envelope = rewritten.envelope;
            rewritten = self.put(&parent, link)?.0;
        }
        let new_root = self.write(&rewritten)?;
        debug!(path, root = %new_root.short_hex(), size = rewritten.size, "tree rewritten");
        Ok(new_root)
    }

    /// Change the default feature type recorded on the tree at `path`.
    pub fn set_tree_metadata(
        &self,
        root: &ObjectId,
        path: &str,
        metadata_id: Option<ObjectId>,
    ) -> TreeResult<ObjectId> {
        let Some(found) = self.lookup(root, path)? else {
            return Err(TreeError::InvalidPath(path.to_string()));
        };
        if !found.is_tree() {
            return Err(TreeError::NotATree(path.to_string()));
        }
        let mut node = found.node;
        node.metadata_id = metadata_id;
        self.update(root, path, Some(node))
    }
}

fn take_named(nodes: &mut Vec<Node>, name: &str) -> Option<Node> {
    nodes
        .iter()
        .position(|n| n.name == name)
        .map(|i| nodes.remove(i))
}
