//! Three-way merge of revision trees.
//!
//! Both sides are diffed against the common ancestor. Paths only one side
//! touched take that side's node; paths both sides changed the same way are
//! taken once; anything else is a [`Conflict`].

use std::collections::{BTreeSet, HashSet};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use gvc_diff::DiffTree;
use gvc_store::{Node, ObjectStore};
use gvc_tree::{path, TreeConfig, TreeEditor};
use gvc_types::ObjectId;
use tracing::{debug, info};

use crate::conflict::Conflict;
use crate::error::MergeResult;

/// How divergent changes are settled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MergeStrategy {
    /// Keep ours in the merged tree and report a conflict.
    #[default]
    Record,
    /// Keep ours silently.
    Ours,
    /// Take theirs silently.
    Theirs,
}

#[derive(Clone, Debug, Default)]
pub struct MergeOptions {
    pub strategy: MergeStrategy,
    pub cancel: Option<Arc<AtomicBool>>,
}

impl MergeOptions {
    pub fn with_strategy(strategy: MergeStrategy) -> Self {
        Self {
            strategy,
            cancel: None,
        }
    }
}

/// Outcome of [`merge_trees`].
#[derive(Clone, Debug, PartialEq)]
pub struct MergeReport {
    /// Root of the merged tree; conflicted paths hold ours (or theirs under
    /// [`MergeStrategy::Theirs`]).
    pub merged_tree: ObjectId,
    pub conflicts: Vec<Conflict>,
    /// Number of changes taken from theirs.
    pub merged_from_theirs: usize,
    /// Divergent paths settled by the strategy instead of being recorded.
    pub auto_resolved: usize,
}

impl MergeReport {
    pub fn is_clean(&self) -> bool {
        self.conflicts.is_empty()
    }
}

/// Merge `theirs` into `ours` relative to `ancestor`.
pub fn merge_trees(
    store: &dyn ObjectStore,
    config: TreeConfig,
    ancestor: &ObjectId,
    ours: &ObjectId,
    theirs: &ObjectId,
    options: &MergeOptions,
) -> MergeResult<MergeReport> {
    let trivial = |merged_tree: ObjectId, merged_from_theirs: usize| MergeReport {
        merged_tree,
        conflicts: Vec::new(),
        merged_from_theirs,
        auto_resolved: 0,
    };
    if ours == theirs || ancestor == theirs {
        return Ok(trivial(*ours, 0));
    }

    if ancestor == ours {
        let mut taken = 0;
        for entry in with_cancel(DiffTree::new(store, *ancestor, *theirs), options).iter() {
            entry?;
            taken += 1;
        }
        return Ok(trivial(*theirs, taken));
    }

    let ours_changed: BTreeSet<String> =
        with_cancel(DiffTree::new(store, *ancestor, *ours).report_trees(true), options)
            .iter()
            .map(|e| e.map(|e| e.path()))
            .collect::<Result<_, _>>()?;

    let editor = TreeEditor::new(store, config);
    let mut merger = Merger {
        editor: &editor,
        ancestor: *ancestor,
        ours: *ours,
        theirs: *theirs,
        strategy: options.strategy,
        merged: *ours,
        conflicts: Vec::new(),
        merged_from_theirs: 0,
        auto_resolved: 0,
        settled: Vec::new(),
    };

    let mut seen: HashSet<String> = HashSet::new();
    let theirs_diff = with_cancel(DiffTree::new(store, *ancestor, *theirs).report_trees(true), options);
    for entry in theirs_diff.iter() {
        let entry = entry?;
        let p = entry.path();
        if !seen.insert(p.clone()) || merger.is_settled(&p) {
            continue;
        }
        if ours_changed.contains(&p) {
            merger.both_changed(&p)?;
        } else {
            merger.take_theirs(&p)?;
        }
    }

    info!(
        merged = %merger.merged.short_hex(),
        conflicts = merger.conflicts.len(),
        from_theirs = merger.merged_from_theirs,
        auto_resolved = merger.auto_resolved,
        "trees merged"
    );
    Ok(MergeReport {
        merged_tree: merger.merged,
        conflicts: merger.conflicts,
        merged_from_theirs: merger.merged_from_theirs,
        auto_resolved: merger.auto_resolved,
    })
}

fn with_cancel<'a>(diff: DiffTree<'a>, options: &MergeOptions) -> DiffTree<'a> {
    match &options.cancel {
        Some(flag) => diff.cancel_flag(flag.clone()),
        None => diff,
    }
}

struct Merger<'e, 'a> {
    editor: &'e TreeEditor<'a>,
    ancestor: ObjectId,
    ours: ObjectId,
    theirs: ObjectId,
    strategy: MergeStrategy,
    merged: ObjectId,
    conflicts: Vec<Conflict>,
    merged_from_theirs: usize,
    auto_resolved: usize,
    /// Sub-trees decided as a whole; later entries below them are skipped.
    settled: Vec<String>,
}

impl Merger<'_, '_> {
    fn is_settled(&self, p: &str) -> bool {
        self.settled.iter().any(|s| path::is_ancestor_of(s, p))
    }

    fn node_at(&self, root: &ObjectId, p: &str) -> MergeResult<Option<Node>> {
        Ok(self.editor.lookup(root, p)?.map(|r| r.node))
    }

    /// Only theirs touched `p`: copy their node, or delete the path.
    ///
    /// Ours changed nothing at or below `p`, so whatever theirs holds there
    /// is final.
    fn take_theirs(&mut self, p: &str) -> MergeResult<()> {
        let node = self.node_at(&self.theirs, p)?;
        self.merged = self.editor.update(&self.merged, p, node)?;
        self.merged_from_theirs += 1;
        self.settled.push(p.to_string());
        Ok(())
    }

    fn both_changed(&mut self, p: &str) -> MergeResult<()> {
        let ours = self.node_at(&self.ours, p)?;
        let theirs = self.node_at(&self.theirs, p)?;
        if ours == theirs {
            return Ok(());
        }
        let ancestor = self.node_at(&self.ancestor, p)?;

        match (&ours, &theirs) {
            (Some(o), Some(t)) if o.is_tree() && t.is_tree() => {
                // Contents merge entry by entry; only the default type is
                // decided here.
                if o.metadata_id == t.metadata_id {
                    return Ok(());
                }
                let base_meta = ancestor.as_ref().filter(|a| a.is_tree()).and_then(|a| a.metadata_id);
                if o.metadata_id == base_meta {
                    self.merged = self.editor.set_tree_metadata(&self.merged, p, t.metadata_id)?;
                    self.merged_from_theirs += 1;
                    return Ok(());
                }
                if t.metadata_id == base_meta {
                    return Ok(());
                }
                self.divergent(p, ancestor, ours, theirs, false)
            }
            // A tree removed on one side while the other changed things
            // below it: settle per entry.
            (Some(o), None) if o.is_tree() => Ok(()),
            (None, Some(t)) if t.is_tree() => Ok(()),
            _ => self.divergent(p, ancestor, ours, theirs, true),
        }
    }

    fn divergent(
        &mut self,
        p: &str,
        ancestor: Option<Node>,
        ours: Option<Node>,
        theirs: Option<Node>,
        settle: bool,
    ) -> MergeResult<()> {
        let id = |n: &Option<Node>| n.as_ref().map(|n| n.object_id).unwrap_or_else(ObjectId::null);
        match self.strategy {
            MergeStrategy::Record => {
                let conflict = Conflict::new(p, id(&ancestor), id(&ours), id(&theirs));
                debug!(conflict = %conflict, "merge conflict");
                self.conflicts.push(conflict);
            }
            MergeStrategy::Ours => self.auto_resolved += 1,
            MergeStrategy::Theirs => {
                self.merged = match (&ours, &theirs) {
                    (Some(o), Some(t)) if o.is_tree() && t.is_tree() => {
                        self.editor.set_tree_metadata(&self.merged, p, t.metadata_id)?
                    }
                    _ => self.editor.update(&self.merged, p, theirs.clone())?,
                };
                self.auto_resolved += 1;
            }
        }
        if settle {
            self.settled.push(p.to_string());
        }
        Ok(())
    }
}
