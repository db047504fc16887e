//! Replaying diff entries onto a tree.

use gvc_store::ObjectStore;
use gvc_tree::{TreeConfig, TreeEditor};
use gvc_types::ObjectId;
use tracing::debug;

use crate::entry::DiffEntry;
use crate::error::DiffResult;

/// Apply `entries` to the tree `base` and return the new root id.
///
/// Each entry sets its path to the new node, or removes the path when the
/// new side is absent. Feeding in a diff of `A` against `B` taken with
/// [`report_trees`](crate::DiffTree::report_trees) turns `A` into exactly
/// `B`; without tree entries, emptied or metadata-only tree changes are not
/// carried over.
pub fn apply_diff<I>(
    store: &dyn ObjectStore,
    config: TreeConfig,
    base: &ObjectId,
    entries: I,
) -> DiffResult<ObjectId>
where
    I: IntoIterator<Item = DiffEntry>,
{
    let editor = TreeEditor::new(store, config);
    let mut root = *base;
    let mut applied = 0usize;
    for entry in entries {
        let p = entry.path();
        root = editor.update(&root, &p, entry.new.map(|r| r.node))?;
        applied += 1;
    }
    debug!(applied, root = %root.short_hex(), "diff applied");
    Ok(root)
}
