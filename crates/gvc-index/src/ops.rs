//! `add` and `status` over a working tree and staging area.

use std::collections::BTreeSet;

use gvc_diff::DiffTree;
use gvc_tree::{path, TreeEditor};
use tracing::info;

use crate::error::IndexResult;
use crate::staging::StagingArea;
use crate::status::{StatusEntry, WorkdirStatus};
use crate::working_tree::WorkingTree;

/// Stage the working-tree changes at or under `paths`, or every change when
/// `paths` is empty, and mark conflicts there resolved.
///
/// Returns the number of diff entries staged, tree entries included.
pub fn add(work: &WorkingTree<'_>, stage: &StagingArea<'_>, paths: &[&str]) -> IndexResult<usize> {
    let entries = DiffTree::new(work.store(), stage.tree_id()?, work.tree_id()?)
        .report_trees(true)
        .filter(paths)
        .collect_entries()?;
    let parents: BTreeSet<String> = entries
        .iter()
        .map(|e| path::split_parent(&e.path()).0.to_string())
        .collect();
    let staged = stage.stage(entries)?;
    if !paths.is_empty() {
        carry_tree_types(work, stage, &parents)?;
    }

    let all = paths.iter().all(|p| p.trim_matches(path::SEPARATOR).is_empty());
    let resolved = if all {
        let n = stage.count_conflicts()?;
        stage.clear_conflicts()?;
        n
    } else {
        let mut n = 0;
        for p in paths {
            n += stage.resolve_under(p.trim_matches(path::SEPARATOR))?;
        }
        n
    };
    info!(staged, resolved, "changes added");
    Ok(staged)
}

/// A filtered add stages features below trees the filter does not reach;
/// give those trees the working tree's default feature type.
fn carry_tree_types(
    work: &WorkingTree<'_>,
    stage: &StagingArea<'_>,
    parents: &BTreeSet<String>,
) -> IndexResult<()> {
    let mut ancestors = BTreeSet::new();
    for parent in parents {
        let mut current = parent.as_str();
        while !current.is_empty() {
            ancestors.insert(current.to_string());
            current = path::split_parent(current).0;
        }
    }

    let editor = TreeEditor::new(work.store(), work.config());
    let work_root = work.tree_id()?;
    let mut stage_root = stage.tree_id()?;
    let before = stage_root;
    for p in &ancestors {
        let (Some(theirs), Some(ours)) = (editor.lookup(&work_root, p)?, editor.lookup(&stage_root, p)?)
        else {
            continue;
        };
        if theirs.is_tree() && ours.is_tree() && theirs.metadata_id() != ours.metadata_id() {
            stage_root = editor.set_tree_metadata(&stage_root, p, theirs.metadata_id())?;
        }
    }
    if stage_root != before {
        stage.update_stage_head(stage_root)?;
    }
    Ok(())
}

/// Staged changes, unstaged changes and unresolved conflicts.
pub fn status(work: &WorkingTree<'_>, stage: &StagingArea<'_>) -> IndexResult<WorkdirStatus> {
    let staged = stage.staged(&[])?;
    let unstaged = work.unstaged(&[])?;
    Ok(WorkdirStatus {
        staged: staged.iter().map(StatusEntry::from_diff).collect(),
        unstaged: unstaged.iter().map(StatusEntry::from_diff).collect(),
        conflicts: stage.conflicts("")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;
    use gvc_diff::ChangeType;
    use gvc_merge::Conflict;
    use gvc_refs::InMemoryRefStore;
    use gvc_store::InMemoryObjectStore;
    use gvc_tree::TreeConfig;
    use gvc_types::ObjectId;

    struct Fixture {
        store: InMemoryObjectStore,
        refs: InMemoryRefStore,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                store: InMemoryObjectStore::new(),
                refs: InMemoryRefStore::new(),
            }
        }

        fn work(&self) -> WorkingTree<'_> {
            WorkingTree::new(&self.store, &self.refs, TreeConfig::default())
        }

        fn stage(&self) -> StagingArea<'_> {
            StagingArea::new(&self.store, &self.refs, TreeConfig::default())
        }
    }

    #[test]
    fn add_everything_matches_work_tree() {
        let fx = Fixture::new();
        let (work, stage) = (fx.work(), fx.stage());
        work.insert_many("parks", &park_type(), five_parks()).unwrap();
        work.create_type_tree("roads", &park_type()).unwrap();

        assert_eq!(add(&work, &stage, &[]).unwrap(), 7);
        assert_eq!(stage.tree_id().unwrap(), work.tree_id().unwrap());
        assert_eq!(add(&work, &stage, &[]).unwrap(), 0);
    }

    #[test]
    fn add_filtered_path() {
        let fx = Fixture::new();
        let (work, stage) = (fx.work(), fx.stage());
        work.insert_many("parks", &park_type(), five_parks()).unwrap();
        work.insert("roads", "1", &park("r", 0.0, 0.0), &park_type()).unwrap();

        add(&work, &stage, &["roads"]).unwrap();
        assert_eq!(stage.count_staged(&[]).unwrap(), 1);
        assert_eq!(work.count_unstaged(&[]).unwrap(), 5);

        add(&work, &stage, &["parks/2"]).unwrap();
        let parks_stage = stage.tree().unwrap();
        assert_eq!(parks_stage.size, 2);
        // The typed parent is carried over even though only one feature was added.
        let editor = TreeEditor::new(&fx.store, TreeConfig::default());
        let staged_parks = editor.lookup(&stage.tree_id().unwrap(), "parks").unwrap().unwrap();
        let work_parks = work.get("parks").unwrap().unwrap();
        assert_eq!(staged_parks.metadata_id(), work_parks.metadata_id());
    }

    #[test]
    fn add_resolves_conflicts() {
        let fx = Fixture::new();
        let (work, stage) = (fx.work(), fx.stage());
        let c = |p: &str| Conflict::new(p, ObjectId::null(), ObjectId::from_bytes(b"o"), ObjectId::from_bytes(b"t"));
        stage
            .record_conflicts([c("parks/1"), c("parks/2"), c("roads/1")])
            .unwrap();

        add(&work, &stage, &["parks"]).unwrap();
        assert_eq!(stage.conflicts("").unwrap(), vec![c("roads/1")]);
        add(&work, &stage, &[]).unwrap();
        assert!(!stage.has_conflicts().unwrap());
    }

    #[test]
    fn status_reports_three_way_state() {
        let fx = Fixture::new();
        let (work, stage) = (fx.work(), fx.stage());
        assert!(status(&work, &stage).unwrap().is_clean());

        work.insert_many("parks", &park_type(), five_parks()).unwrap();
        add(&work, &stage, &[]).unwrap();
        work.delete("parks/1").unwrap();
        work.insert("parks", "2", &park("renamed", 2.0, 0.0), &park_type()).unwrap();

        let st = status(&work, &stage).unwrap();
        assert_eq!(st.staged.len(), 5);
        assert!(st.staged.iter().all(|e| e.change == ChangeType::Added));
        let unstaged: Vec<(ChangeType, &str)> =
            st.unstaged.iter().map(|e| (e.change, e.path.as_str())).collect();
        assert_eq!(
            unstaged,
            vec![(ChangeType::Removed, "parks/1"), (ChangeType::Modified, "parks/2")]
        );
        assert!(!st.has_conflicts());
        assert!(!st.is_clean());
    }
}
