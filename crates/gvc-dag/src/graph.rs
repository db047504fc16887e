//! The commit graph: an id-indexed arena of commits with ancestry queries.
//!
//! Nodes are keyed by commit id and refer to their parents by id, so walks
//! are plain breadth-first searches over a `HashMap` with no pointer chasing.

use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};

use gvc_store::{ObjectStore, ObjectStoreExt, RevCommit, StoreError};
use gvc_types::ObjectId;
use tracing::debug;

use crate::error::{DagError, DagResult};
use crate::node::CommitNode;

const OURS: u8 = 0b01;
const THEIRS: u8 = 0b10;

/// In-memory commit graph.
///
/// A commit can only be added once all of its parents are present, which
/// keeps generation numbers well defined and rules out cycles.
#[derive(Clone, Debug, Default)]
pub struct CommitGraph {
    nodes: HashMap<ObjectId, CommitNode>,
    /// Reverse edges: parent id -> child ids.
    children: HashMap<ObjectId, Vec<ObjectId>>,
}

impl CommitGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &ObjectId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn get(&self, id: &ObjectId) -> Option<&CommitNode> {
        self.nodes.get(id)
    }

    fn node(&self, id: &ObjectId) -> DagResult<&CommitNode> {
        self.nodes.get(id).ok_or(DagError::CommitNotFound(*id))
    }

    /// Direct children of a commit that are known to the graph.
    pub fn children(&self, id: &ObjectId) -> &[ObjectId] {
        self.children.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All root commits (no parents).
    pub fn roots(&self) -> Vec<&CommitNode> {
        let mut roots: Vec<&CommitNode> = self.nodes.values().filter(|n| n.is_root()).collect();
        roots.sort_by_key(|n| n.id);
        roots
    }

    /// Generation number of a commit.
    pub fn generation(&self, id: &ObjectId) -> DagResult<u64> {
        Ok(self.node(id)?.generation)
    }

    /// Add a commit whose parents are already in the graph.
    ///
    /// Re-adding a known commit is a no-op.
    pub fn insert(
        &mut self,
        id: ObjectId,
        parents: Vec<ObjectId>,
        commit_time: i64,
    ) -> DagResult<&CommitNode> {
        if !self.nodes.contains_key(&id) {
            let mut generation = 0;
            for parent in &parents {
                let p = self.nodes.get(parent).ok_or(DagError::DanglingParent {
                    commit: id,
                    parent: *parent,
                })?;
                generation = generation.max(p.generation);
            }
            for parent in &parents {
                let siblings = self.children.entry(*parent).or_default();
                if !siblings.contains(&id) {
                    siblings.push(id);
                }
            }
            self.nodes.insert(
                id,
                CommitNode {
                    id,
                    parents,
                    commit_time,
                    generation: generation + 1,
                },
            );
        }
        self.node(&id)
    }

    /// Add a decoded commit object.
    pub fn add_commit(&mut self, id: ObjectId, commit: &RevCommit) -> DagResult<&CommitNode> {
        self.insert(id, commit.parents.clone(), commit.committer.timestamp)
    }

    /// Build a graph holding everything reachable from `tips`.
    pub fn load<S: ObjectStore + ?Sized>(store: &S, tips: &[ObjectId]) -> DagResult<Self> {
        let mut graph = Self::new();
        graph.extend(store, tips)?;
        Ok(graph)
    }

    /// Load every commit reachable from `tips` that is not yet in the graph.
    ///
    /// Commits are inserted parents-first using an explicit stack, so deep
    /// histories do not recurse.
    pub fn extend<S: ObjectStore + ?Sized>(&mut self, store: &S, tips: &[ObjectId]) -> DagResult<()> {
        let mut pending: HashMap<ObjectId, RevCommit> = HashMap::new();
        let mut loaded = 0usize;
        for tip in tips {
            if self.contains(tip) {
                continue;
            }
            // (id, parents already scheduled)
            let mut stack: Vec<(ObjectId, bool)> = vec![(*tip, false)];
            while let Some((id, expanded)) = stack.pop() {
                if self.contains(&id) {
                    continue;
                }
                if expanded {
                    if let Some(commit) = pending.remove(&id) {
                        self.add_commit(id, &commit)?;
                        loaded += 1;
                    }
                    continue;
                }
                if pending.contains_key(&id) {
                    // Already scheduled deeper in the stack.
                    continue;
                }
                let commit = store.get_commit(&id).map_err(|e| match e {
                    StoreError::NotFound(missing) => DagError::CommitNotFound(missing),
                    other => DagError::Store(other),
                })?;
                stack.push((id, true));
                for parent in commit.parents.iter().rev() {
                    if !self.contains(parent) && !pending.contains_key(parent) {
                        stack.push((*parent, false));
                    }
                }
                pending.insert(id, commit);
            }
        }
        if loaded > 0 {
            debug!(loaded, total = self.len(), "commit graph extended");
        }
        Ok(())
    }

    /// Best common ancestor of two commits.
    ///
    /// Both tips are walked breadth-first in lockstep. Each round first
    /// expands the `ours` frontier and then the `theirs` frontier, visiting
    /// parents in stored order; the first commit reached from both sides is
    /// returned. On skewed histories this can be a common ancestor that is
    /// not the lowest one. Returns `None` for unrelated histories.
    pub fn merge_base(&self, ours: &ObjectId, theirs: &ObjectId) -> DagResult<Option<ObjectId>> {
        self.node(ours)?;
        self.node(theirs)?;
        if ours == theirs {
            return Ok(Some(*ours));
        }

        let mut seen: HashMap<ObjectId, u8> = HashMap::new();
        seen.insert(*ours, OURS);
        seen.insert(*theirs, THEIRS);
        let mut frontiers = [vec![*ours], vec![*theirs]];
        let mut depth = 0usize;

        while frontiers.iter().any(|f| !f.is_empty()) {
            depth += 1;
            for (side, other) in [(OURS, THEIRS), (THEIRS, OURS)] {
                let slot = if side == OURS { 0 } else { 1 };
                let mut next = Vec::new();
                for id in &frontiers[slot] {
                    for parent in &self.node(id)?.parents {
                        let flags = seen.entry(*parent).or_insert(0);
                        if *flags & side != 0 {
                            continue;
                        }
                        *flags |= side;
                        if *flags & other != 0 {
                            debug!(base = %parent.short_hex(), depth, "merge base found");
                            return Ok(Some(*parent));
                        }
                        next.push(*parent);
                    }
                }
                frontiers[slot] = next;
            }
        }
        Ok(None)
    }

    /// Whether `ancestor` is reachable from `descendant` (a commit is its own
    /// ancestor).
    pub fn is_ancestor(&self, ancestor: &ObjectId, descendant: &ObjectId) -> DagResult<bool> {
        let target = self.node(ancestor)?.generation;
        self.node(descendant)?;
        if ancestor == descendant {
            return Ok(true);
        }

        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([*descendant]);
        while let Some(id) = queue.pop_front() {
            if !visited.insert(id) {
                continue;
            }
            for parent in &self.node(&id)?.parents {
                if parent == ancestor {
                    return Ok(true);
                }
                // Generations strictly decrease along parent edges.
                if self.node(parent)?.generation > target {
                    queue.push_back(*parent);
                }
            }
        }
        Ok(false)
    }

    /// Commits reachable from `tip`, newest first by committer time.
    ///
    /// With `first_parent` only the mainline is followed. `limit` caps the
    /// number of commits returned.
    pub fn history(
        &self,
        tip: &ObjectId,
        first_parent: bool,
        limit: Option<usize>,
    ) -> DagResult<Vec<ObjectId>> {
        let max = limit.unwrap_or(usize::MAX);
        let mut out = Vec::new();
        let mut visited = HashSet::new();
        let mut heap = BinaryHeap::new();
        let start = self.node(tip)?;
        heap.push((start.commit_time, start.generation, start.id));

        while let Some((_, _, id)) = heap.pop() {
            if out.len() >= max {
                break;
            }
            if !visited.insert(id) {
                continue;
            }
            out.push(id);
            let node = self.node(&id)?;
            let parents = if first_parent {
                &node.parents[..node.parents.len().min(1)]
            } else {
                &node.parents[..]
            };
            for parent in parents {
                if !visited.contains(parent) {
                    let p = self.node(parent)?;
                    heap.push((p.commit_time, p.generation, p.id));
                }
            }
        }
        Ok(out)
    }

    /// Commits reachable from `tip` but not from `base`, parents before
    /// children.
    ///
    /// `base == None` returns the full history of `tip`.
    pub fn commits_between(
        &self,
        base: Option<&ObjectId>,
        tip: &ObjectId,
    ) -> DagResult<Vec<ObjectId>> {
        let excluded = match base {
            Some(base) => self.reachable(base)?,
            None => HashSet::new(),
        };
        let mut nodes: Vec<&CommitNode> = self
            .reachable(tip)?
            .into_iter()
            .filter(|id| !excluded.contains(id))
            .map(|id| self.node(&id))
            .collect::<DagResult<_>>()?;
        nodes.sort_by_key(|n| (n.generation, n.commit_time, n.id));
        Ok(nodes.into_iter().map(|n| n.id).collect())
    }

    fn reachable(&self, tip: &ObjectId) -> DagResult<HashSet<ObjectId>> {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([*tip]);
        while let Some(id) = queue.pop_front() {
            if !visited.insert(id) {
                continue;
            }
            for parent in &self.node(&id)?.parents {
                if !visited.contains(parent) {
                    queue.push_back(*parent);
                }
            }
        }
        Ok(visited)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gvc_store::InMemoryObjectStore;
    use gvc_store::RevTree;
    use gvc_types::Person;

    fn oid(byte: u8) -> ObjectId {
        ObjectId::from_hash([byte; 32])
    }

    fn add(graph: &mut CommitGraph, id: u8, parents: &[u8]) {
        graph
            .insert(oid(id), parents.iter().map(|p| oid(*p)).collect(), id as i64 * 1000)
            .unwrap();
    }

    /// Linear chain: 1 <- 2 <- 3
    fn build_linear() -> CommitGraph {
        let mut g = CommitGraph::new();
        add(&mut g, 1, &[]);
        add(&mut g, 2, &[1]);
        add(&mut g, 3, &[2]);
        g
    }

    /// Diamond:
    ///   1
    ///  / \
    /// 2   3
    ///  \ /
    ///   4
    fn build_diamond() -> CommitGraph {
        let mut g = CommitGraph::new();
        add(&mut g, 1, &[]);
        add(&mut g, 2, &[1]);
        add(&mut g, 3, &[1]);
        add(&mut g, 4, &[2, 3]);
        g
    }

    // ---- construction ----

    #[test]
    fn empty_graph() {
        let g = CommitGraph::new();
        assert!(g.is_empty());
        assert!(g.roots().is_empty());
    }

    #[test]
    fn dangling_parent_is_rejected() {
        let mut g = CommitGraph::new();
        let err = g.insert(oid(2), vec![oid(99)], 0).unwrap_err();
        assert!(matches!(err, DagError::DanglingParent { .. }));
        assert!(g.is_empty());
    }

    #[test]
    fn reinsert_is_noop() {
        let mut g = build_linear();
        add(&mut g, 2, &[1]);
        assert_eq!(g.len(), 3);
        assert_eq!(g.children(&oid(1)), &[oid(2)]);
    }

    #[test]
    fn generations() {
        let g = build_diamond();
        assert_eq!(g.generation(&oid(1)).unwrap(), 1);
        assert_eq!(g.generation(&oid(2)).unwrap(), 2);
        assert_eq!(g.generation(&oid(4)).unwrap(), 3);
        assert!(matches!(
            g.generation(&oid(9)),
            Err(DagError::CommitNotFound(_))
        ));
        assert!(g.get(&oid(4)).unwrap().is_merge());
    }

    // ---- merge base ----

    #[test]
    fn merge_base_same_commit() {
        let g = build_linear();
        assert_eq!(g.merge_base(&oid(2), &oid(2)).unwrap(), Some(oid(2)));
    }

    #[test]
    fn merge_base_ancestor_in_chain() {
        let g = build_linear();
        assert_eq!(g.merge_base(&oid(3), &oid(1)).unwrap(), Some(oid(1)));
        assert_eq!(g.merge_base(&oid(1), &oid(3)).unwrap(), Some(oid(1)));
    }

    #[test]
    fn merge_base_diamond_sides() {
        let g = build_diamond();
        assert_eq!(g.merge_base(&oid(2), &oid(3)).unwrap(), Some(oid(1)));
        assert_eq!(g.merge_base(&oid(4), &oid(3)).unwrap(), Some(oid(3)));
    }

    #[test]
    fn merge_base_unrelated_histories() {
        let mut g = build_linear();
        add(&mut g, 10, &[]);
        add(&mut g, 11, &[10]);
        assert_eq!(g.merge_base(&oid(3), &oid(11)).unwrap(), None);
    }

    #[test]
    fn merge_base_ours_frontier_expands_first() {
        // ours = 4 -> 2 -> 1, theirs = 5 -> {3, 2}. Round one marks 2 from
        // ours, then theirs reaches it before 1 is ever visited.
        let mut g = CommitGraph::new();
        add(&mut g, 1, &[]);
        add(&mut g, 2, &[1]);
        add(&mut g, 3, &[1]);
        add(&mut g, 4, &[2]);
        add(&mut g, 5, &[3, 2]);
        assert_eq!(g.merge_base(&oid(4), &oid(5)).unwrap(), Some(oid(2)));
    }

    #[test]
    fn merge_base_unknown_commit() {
        let g = build_linear();
        assert!(g.merge_base(&oid(1), &oid(42)).is_err());
    }

    // ---- ancestry ----

    #[test]
    fn is_ancestor_queries() {
        let g = build_diamond();
        assert!(g.is_ancestor(&oid(1), &oid(4)).unwrap());
        assert!(g.is_ancestor(&oid(3), &oid(4)).unwrap());
        assert!(g.is_ancestor(&oid(4), &oid(4)).unwrap());
        assert!(!g.is_ancestor(&oid(4), &oid(1)).unwrap());
        assert!(!g.is_ancestor(&oid(2), &oid(3)).unwrap());
    }

    // ---- history ----

    #[test]
    fn history_is_newest_first() {
        let g = build_diamond();
        assert_eq!(
            g.history(&oid(4), false, None).unwrap(),
            vec![oid(4), oid(3), oid(2), oid(1)]
        );
    }

    #[test]
    fn history_first_parent_and_limit() {
        let g = build_diamond();
        assert_eq!(
            g.history(&oid(4), true, None).unwrap(),
            vec![oid(4), oid(2), oid(1)]
        );
        assert_eq!(g.history(&oid(4), false, Some(2)).unwrap().len(), 2);
    }

    #[test]
    fn commits_between_excludes_base_history() {
        let g = build_diamond();
        assert_eq!(
            g.commits_between(Some(&oid(2)), &oid(4)).unwrap(),
            vec![oid(3), oid(4)]
        );
        assert_eq!(g.commits_between(None, &oid(3)).unwrap(), vec![oid(1), oid(3)]);
        assert!(g.commits_between(Some(&oid(4)), &oid(2)).unwrap().is_empty());
    }

    // ---- loading ----

    fn commit(store: &InMemoryObjectStore, parents: Vec<ObjectId>, ts: i64) -> ObjectId {
        let who = Person::new("t", "t@example.com", ts, 0);
        let c = RevCommit::new(RevTree::empty_id(), parents, who.clone(), who, format!("c{ts}"));
        store.put_commit(&c).unwrap()
    }

    #[test]
    fn load_from_store() {
        let store = InMemoryObjectStore::new();
        let a = commit(&store, vec![], 1);
        let b = commit(&store, vec![a], 2);
        let c = commit(&store, vec![a], 3);
        let m = commit(&store, vec![b, c], 4);

        let mut g = CommitGraph::load(&store, &[b]).unwrap();
        assert_eq!(g.len(), 2);
        g.extend(&store, &[m]).unwrap();
        assert_eq!(g.len(), 4);
        assert_eq!(g.generation(&m).unwrap(), 3);
        assert_eq!(g.merge_base(&b, &c).unwrap(), Some(a));
    }

    #[test]
    fn load_missing_commit() {
        let store = InMemoryObjectStore::new();
        let err = CommitGraph::load(&store, &[oid(7)]).unwrap_err();
        assert!(matches!(err, DagError::CommitNotFound(id) if id == oid(7)));
    }
}
