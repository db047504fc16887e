//! A root tree addressed through a ref.

use gvc_refs::{names, RefStore, RefValue};
use gvc_store::{ObjectStore, ObjectStoreExt, RevTree};
use gvc_tree::{TreeConfig, TreeEditor};
use gvc_types::ObjectId;
use tracing::debug;

use crate::error::IndexResult;

/// The tree a ref such as `WORK_HEAD` points at. An absent ref reads as the
/// empty tree.
#[derive(Clone, Copy)]
pub(crate) struct TreeRef<'a> {
    pub store: &'a dyn ObjectStore,
    pub refs: &'a dyn RefStore,
    pub config: TreeConfig,
    pub name: &'static str,
}

impl<'a> TreeRef<'a> {
    pub fn editor(&self) -> TreeEditor<'a> {
        TreeEditor::new(self.store, self.config)
    }

    pub fn id(&self) -> IndexResult<ObjectId> {
        Ok(self.refs.resolve(self.name)?.unwrap_or_else(RevTree::empty_id))
    }

    pub fn tree(&self) -> IndexResult<RevTree> {
        Ok(self.editor().load(&self.id()?)?)
    }

    /// Point the ref at `new` unconditionally.
    pub fn set(&self, new: ObjectId) -> IndexResult<()> {
        self.refs.set(self.name, RefValue::Direct(new))?;
        debug!(ref_name = self.name, tree = %new.short_hex(), "tree ref set");
        Ok(())
    }

    /// Rewrite the tree with `f` and move the ref by compare-and-swap
    /// against the value it had before `f` ran.
    pub fn edit<F>(&self, f: F) -> IndexResult<ObjectId>
    where
        F: FnOnce(&TreeEditor<'a>, ObjectId) -> IndexResult<ObjectId>,
    {
        let before = self.refs.read(self.name)?;
        let root = before
            .as_ref()
            .and_then(RefValue::as_direct)
            .unwrap_or_else(RevTree::empty_id);
        let new = f(&self.editor(), root)?;
        if new != root || before.is_none() {
            self.refs
                .compare_and_swap(self.name, before.as_ref(), Some(RefValue::Direct(new)))?;
            debug!(ref_name = self.name, tree = %new.short_hex(), "tree ref moved");
        }
        Ok(new)
    }
}

/// Root tree of the commit HEAD resolves to, the empty tree while the
/// current branch is unborn.
pub fn head_tree_id(store: &dyn ObjectStore, refs: &dyn RefStore) -> IndexResult<ObjectId> {
    match refs.resolve(names::HEAD)? {
        Some(commit) => Ok(store.get_commit(&commit)?.tree_id),
        None => Ok(RevTree::empty_id()),
    }
}
