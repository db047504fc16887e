//! The staging area: the tree at `STAGE_HEAD` plus the conflict index.
//!
//! Conflicts are persisted as a JSON blob under `MERGE_CONFLICTS`, so an
//! interrupted merge is still unresolved when the repository is reopened.
//! The ref is absent whenever there are no conflicts.

use gvc_diff::{apply_diff, DiffEntry, DiffTree};
use gvc_merge::{Conflict, ConflictIndex, MergeError};
use gvc_refs::{names, RefStore, RefValue};
use gvc_store::{ObjectStore, ObjectStoreExt, RevBlob, RevTree};
use gvc_tree::TreeConfig;
use gvc_types::ObjectId;
use tracing::debug;

use crate::error::IndexResult;
use crate::tree_ref::{head_tree_id, TreeRef};

/// The tree the next commit will record.
///
/// Conflicts recorded by a merge stay here until the conflicting paths are
/// staged again or explicitly resolved.
#[derive(Clone, Copy)]
pub struct StagingArea<'a> {
    tree: TreeRef<'a>,
}

impl<'a> StagingArea<'a> {
    pub fn new(store: &'a dyn ObjectStore, refs: &'a dyn RefStore, config: TreeConfig) -> Self {
        Self {
            tree: TreeRef {
                store,
                refs,
                config,
                name: names::STAGE_HEAD,
            },
        }
    }

    pub fn tree_id(&self) -> IndexResult<ObjectId> {
        self.tree.id()
    }

    pub fn tree(&self) -> IndexResult<RevTree> {
        self.tree.tree()
    }

    /// Replace the whole staged tree.
    pub fn update_stage_head(&self, tree_id: ObjectId) -> IndexResult<()> {
        self.tree.set(tree_id)
    }

    /// Apply `entries` to the staged tree and clear conflicts recorded at
    /// the paths they touch. Returns the number of entries applied.
    pub fn stage<I>(&self, entries: I) -> IndexResult<usize>
    where
        I: IntoIterator<Item = DiffEntry>,
    {
        let entries: Vec<DiffEntry> = entries.into_iter().collect();
        if entries.is_empty() {
            return Ok(0);
        }
        let store = self.tree.store;
        let config = self.tree.config;
        self.tree
            .edit(|_, root| Ok(apply_diff(store, config, &root, entries.iter().cloned())?))?;

        self.edit_conflicts(|conflicts| {
            for entry in &entries {
                conflicts.remove(&entry.path());
            }
        })?;
        debug!(count = entries.len(), "entries staged");
        Ok(entries.len())
    }

    /// Staged changes relative to the `HEAD` commit, limited to `paths`
    /// (all when empty).
    pub fn staged(&self, paths: &[&str]) -> IndexResult<Vec<DiffEntry>> {
        let head = head_tree_id(self.tree.store, self.tree.refs)?;
        Ok(DiffTree::new(self.tree.store, head, self.tree_id()?)
            .filter(paths)
            .collect_entries()?)
    }

    pub fn count_staged(&self, paths: &[&str]) -> IndexResult<usize> {
        Ok(self.staged(paths)?.len())
    }

    // -----------------------------------------------------------------------
    // Conflicts
    // -----------------------------------------------------------------------

    /// The persisted conflict index, with the ref value it was read from.
    fn load_conflicts(&self) -> IndexResult<(Option<RefValue>, ConflictIndex)> {
        let current = self.tree.refs.read(names::MERGE_CONFLICTS)?;
        let index = match current.as_ref().and_then(RefValue::as_direct) {
            Some(id) => {
                let blob = self.tree.store.get_blob(&id)?;
                let json = String::from_utf8(blob.data)
                    .map_err(|e| MergeError::InvalidConflict(e.to_string()))?;
                ConflictIndex::from_json(&json)?
            }
            None => ConflictIndex::new(),
        };
        Ok((current, index))
    }

    /// Apply `f` to the conflict index and write it back by compare-and-swap
    /// against the ref value it was loaded from.
    fn edit_conflicts<T>(&self, f: impl FnOnce(&mut ConflictIndex) -> T) -> IndexResult<T> {
        let (before, mut index) = self.load_conflicts()?;
        let out = f(&mut index);
        let after = if index.is_empty() {
            None
        } else {
            let blob = RevBlob::new(index.to_json()?.into_bytes());
            Some(RefValue::Direct(self.tree.store.put_blob(&blob)?))
        };
        if after != before {
            self.tree
                .refs
                .compare_and_swap(names::MERGE_CONFLICTS, before.as_ref(), after)?;
            debug!(conflicts = index.len(), "conflict index written");
        }
        Ok(out)
    }

    /// Every unresolved conflict.
    pub fn conflict_index(&self) -> IndexResult<ConflictIndex> {
        Ok(self.load_conflicts()?.1)
    }

    /// Unresolved conflicts at or under `prefix`, sorted by path.
    pub fn conflicts(&self, prefix: &str) -> IndexResult<Vec<Conflict>> {
        Ok(self
            .conflict_index()?
            .under(prefix)
            .into_iter()
            .cloned()
            .collect())
    }

    pub fn conflict(&self, path: &str) -> IndexResult<Option<Conflict>> {
        Ok(self.conflict_index()?.get(path).cloned())
    }

    pub fn has_conflicts(&self) -> IndexResult<bool> {
        Ok(self.tree.refs.read(names::MERGE_CONFLICTS)?.is_some())
    }

    pub fn count_conflicts(&self) -> IndexResult<usize> {
        Ok(self.conflict_index()?.len())
    }

    pub fn record_conflicts<I>(&self, conflicts: I) -> IndexResult<()>
    where
        I: IntoIterator<Item = Conflict>,
    {
        self.edit_conflicts(|index| index.extend(conflicts))
    }

    /// Mark one path resolved. Returns `false` if it had no conflict.
    pub fn resolve(&self, path: &str) -> IndexResult<bool> {
        self.edit_conflicts(|index| index.remove(path).is_some())
    }

    /// Mark every conflict at or under `prefix` resolved.
    pub fn resolve_under(&self, prefix: &str) -> IndexResult<usize> {
        self.edit_conflicts(|index| index.remove_under(prefix).len())
    }

    pub fn clear_conflicts(&self) -> IndexResult<()> {
        self.edit_conflicts(ConflictIndex::clear)
    }
}
