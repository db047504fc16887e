//! The state every repository operation runs against.

use std::sync::Arc;

use gvc_dag::CommitGraph;
use gvc_diff::{DiffEntry, DiffTree};
use gvc_index::{StagingArea, WorkdirStatus, WorkingTree};
use gvc_merge::Conflict;
use gvc_refs::{names, Head, RefStore};
use gvc_store::{ObjectStore, ObjectStoreExt, RevCommit, RevObject};
use gvc_tree::TreeEditor;
use gvc_types::ObjectId;
use tracing::warn;

use crate::config::RepositoryConfig;
use crate::error::{RepoError, RepoResult};

/// One unresolved conflict as listed by [`RepoContext::conflicts`].
///
/// The object versions are left out when only ids were asked for, and are
/// `None` for a side where the object does not exist.
#[derive(Clone, Debug, PartialEq)]
pub struct ConflictDescription {
    pub conflict: Conflict,
    pub ancestor: Option<RevObject>,
    pub ours: Option<RevObject>,
    pub theirs: Option<RevObject>,
}

impl std::fmt::Display for ConflictDescription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.conflict)
    }
}

/// One commit as listed by [`RepoContext::log`].
#[derive(Clone, Debug, PartialEq)]
pub struct LogEntry {
    pub id: ObjectId,
    pub commit: RevCommit,
}

/// A shared object store and a ref namespace. Working tree, staging area
/// and conflict index all live behind refs.
///
/// [`Repository`](crate::Repository) and [`Transaction`](crate::Transaction)
/// each own one; everything that reads or moves refs is a method here, so
/// both expose the same operations.
pub struct RepoContext {
    store: Arc<dyn ObjectStore>,
    refs: Arc<dyn RefStore>,
    config: RepositoryConfig,
}

impl RepoContext {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        refs: Arc<dyn RefStore>,
        config: RepositoryConfig,
    ) -> Self {
        Self { store, refs, config }
    }

    pub fn store(&self) -> &dyn ObjectStore {
        self.store.as_ref()
    }

    pub(crate) fn shared_store(&self) -> Arc<dyn ObjectStore> {
        Arc::clone(&self.store)
    }

    pub fn refs(&self) -> &dyn RefStore {
        self.refs.as_ref()
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    pub fn work(&self) -> WorkingTree<'_> {
        WorkingTree::new(self.store(), self.refs(), self.config.tree)
    }

    pub fn stage(&self) -> StagingArea<'_> {
        StagingArea::new(self.store(), self.refs(), self.config.tree)
    }

    pub(crate) fn editor(&self) -> TreeEditor<'_> {
        TreeEditor::new(self.store(), self.config.tree)
    }

    // -----------------------------------------------------------------------
    // HEAD
    // -----------------------------------------------------------------------

    pub fn head(&self) -> RepoResult<Head> {
        self.refs.head()?.ok_or(RepoError::NotInitialized)
    }

    /// Short name of the checked-out branch, `None` when detached.
    pub fn current_branch(&self) -> RepoResult<Option<String>> {
        Ok(match self.head()? {
            Head::Symbolic(branch) => Some(branch),
            Head::Detached(_) => None,
        })
    }

    /// Commit `HEAD` resolves to, `None` on an unborn branch.
    pub fn head_commit(&self) -> RepoResult<Option<ObjectId>> {
        Ok(self.refs.resolve(names::HEAD)?)
    }

    /// Root tree of the `HEAD` commit, the empty tree on an unborn branch.
    pub fn head_tree(&self) -> RepoResult<ObjectId> {
        Ok(gvc_index::head_tree_id(self.store(), self.refs())?)
    }

    pub(crate) fn commit_tree(&self, commit: &ObjectId) -> RepoResult<ObjectId> {
        Ok(self.store.get_commit(commit)?.tree_id)
    }

    /// Point the working tree and the staging area at `tree`. If the working
    /// tree cannot be moved the staging area is put back.
    pub(crate) fn reset_trees(&self, tree: ObjectId) -> RepoResult<()> {
        let stage = self.stage();
        let previous = stage.tree_id()?;
        stage.update_stage_head(tree)?;
        if let Err(e) = self.work().update_work_head(tree) {
            if let Err(undo) = stage.update_stage_head(previous) {
                warn!(error = %undo, "staging area not restored");
            }
            return Err(e.into());
        }
        Ok(())
    }

    /// Drop recorded conflicts and `MERGE_HEAD`.
    pub(crate) fn clear_merge_state(&self) -> RepoResult<()> {
        self.stage().clear_conflicts()?;
        self.refs.remove(names::MERGE_HEAD)?;
        Ok(())
    }

    /// The working tree differs from the staging area, or the staging area
    /// from `HEAD`.
    pub fn is_dirty(&self) -> RepoResult<bool> {
        let stage = self.stage().tree_id()?;
        Ok(self.work().tree_id()? != stage || stage != self.head_tree()?)
    }

    pub(crate) fn graph(&self, tips: &[ObjectId]) -> RepoResult<CommitGraph> {
        Ok(CommitGraph::load(self.store(), tips)?)
    }

    // -----------------------------------------------------------------------
    // Index
    // -----------------------------------------------------------------------

    /// Stage working-tree changes under `paths`, all of them when empty.
    pub fn add(&self, paths: &[&str]) -> RepoResult<usize> {
        Ok(gvc_index::add(&self.work(), &self.stage(), paths)?)
    }

    pub fn status(&self) -> RepoResult<WorkdirStatus> {
        Ok(gvc_index::status(&self.work(), &self.stage())?)
    }

    /// Unresolved conflicts at or under `prefix` (all when empty), sorted by
    /// path. With `ids_only` the three object versions are not loaded.
    pub fn conflicts(&self, prefix: &str, ids_only: bool) -> RepoResult<Vec<ConflictDescription>> {
        let load = |id: ObjectId| -> RepoResult<Option<RevObject>> {
            if ids_only {
                return Ok(None);
            }
            match id.non_null() {
                Some(id) => Ok(self.store.get_if_exists(&id)?),
                None => Ok(None),
            }
        };
        self.stage()
            .conflicts(prefix)?
            .into_iter()
            .map(|conflict| {
                Ok(ConflictDescription {
                    ancestor: load(conflict.ancestor)?,
                    ours: load(conflict.ours)?,
                    theirs: load(conflict.theirs)?,
                    conflict,
                })
            })
            .collect()
    }

    // -----------------------------------------------------------------------
    // History
    // -----------------------------------------------------------------------

    /// Commits reachable from `spec`, newest first.
    pub fn log(&self, spec: &str, limit: Option<usize>) -> RepoResult<Vec<LogEntry>> {
        let tip = self.resolve_commit(spec)?;
        let graph = self.graph(&[tip])?;
        graph
            .history(&tip, false, limit)?
            .into_iter()
            .map(|id| {
                Ok(LogEntry {
                    id,
                    commit: self.store.get_commit(&id)?,
                })
            })
            .collect()
    }

    /// Changes from one tree-ish to another, limited to `paths`.
    pub fn diff(&self, old: &str, new: &str, paths: &[&str]) -> RepoResult<Vec<DiffEntry>> {
        let old = self.resolve_treeish(old)?;
        let new = self.resolve_treeish(new)?;
        Ok(DiffTree::new(self.store(), old, new)
            .filter(paths)
            .collect_entries()?)
    }
}
