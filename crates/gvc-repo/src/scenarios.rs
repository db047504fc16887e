//! End-to-end flows across checkout, merge, commit and history.

use gvc_diff::ChangeType;
use gvc_refs::names;
use gvc_store::{ObjectStoreExt, RevObject};

use crate::testing::*;
use crate::*;

#[test]
fn conflict_resolved_with_theirs_commits_two_parents() {
    let repo = repo();
    repo.work()
        .insert_many("parks", &park_type(), five_parks())
        .unwrap();
    assert_eq!(repo.add(&[]).unwrap(), 6);
    let base = repo.commit("five parks").unwrap();

    repo.create_branch("b2", None, false).unwrap();
    switch(&repo, "b2");
    let theirs = edit_park(&repo, "3", "riverside", "rename on b2");
    switch(&repo, "master");
    let ours = edit_park(&repo, "3", "hilltop", "rename on master");

    let MergeOutcome::Conflicted { conflicts } =
        repo.merge("b2", &BranchMergeOptions::default()).unwrap()
    else {
        panic!("expected a conflict");
    };
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].path, "parks/3");
    let status = repo.status().unwrap();
    assert!(status.has_conflicts());
    assert_eq!(status.conflicts.len(), 1);
    assert_eq!(
        repo.commit("too early").unwrap_err().kind(),
        ErrorKind::PreconditionFailed
    );

    let result = repo
        .checkout(&CheckoutOptions::paths(["parks/3"]).theirs())
        .unwrap();
    assert_eq!(result.kind, CheckoutKind::UpdateObjects);
    assert_eq!(result.oid, ours);
    assert_eq!(park_name(&repo, "WORK_HEAD:parks/3"), "riverside");
    assert!(!repo.status().unwrap().has_conflicts());

    let merge = repo.commit("merge b2").unwrap();
    let commit = repo.store().get_commit(&merge).unwrap();
    assert_eq!(commit.parents, vec![ours, theirs]);
    assert!(repo.refs().read(names::MERGE_HEAD).unwrap().is_none());
    assert_eq!(park_name(&repo, "HEAD:parks/3"), "riverside");
    assert_eq!(park_name(&repo, "HEAD:parks/4"), "park 4");
    assert!(!repo.is_dirty().unwrap());

    let log = repo.log("HEAD", None).unwrap();
    assert_eq!(log.len(), 4);
    assert_eq!(log[0].id, merge);
    assert_eq!(log.last().map(|e| e.id), Some(base));

    let diff = repo.diff("HEAD^", "HEAD", &[]).unwrap();
    assert_eq!(diff.len(), 1);
    assert_eq!(diff[0].change_type(), ChangeType::Modified);
    assert_eq!(diff[0].path(), "parks/3");
}

#[test]
fn local_changes_and_forced_checkout() {
    let repo = repo();
    commit_parks(&repo, &["1", "2"], "base");
    repo.create_branch("other", None, false).unwrap();
    switch(&repo, "other");
    let other = edit_park(&repo, "2", "meadow", "edit on other");
    switch(&repo, "master");

    repo.work().delete("parks/1").unwrap();
    let status = repo.status().unwrap();
    assert_eq!(status.unstaged.len(), 1);
    assert!(status.staged.is_empty());

    let err = repo.checkout(&CheckoutOptions::branch("other")).unwrap_err();
    assert_eq!(
        err.to_string(),
        "checkout failed: working tree and index are not clean; use force to overwrite local changes"
    );
    assert!(repo.work().get("parks/1").unwrap().is_none());

    let result = repo
        .checkout(&CheckoutOptions::branch("other").force())
        .unwrap();
    assert_eq!(result.oid, other);
    assert_eq!(repo.work().tree_id().unwrap(), repo.commit_tree(&other).unwrap());
    assert!(repo.work().get("parks/1").unwrap().is_some());
    assert!(repo.status().unwrap().is_clean());
}

#[test]
fn staged_edits_survive_status_and_commit() {
    let repo = repo();
    commit_parks(&repo, &["1"], "base");
    repo.work()
        .insert("parks", "2", &park("lakeside", 2.0, 0.0), &park_type())
        .unwrap();
    repo.work()
        .insert("parks", "3", &park("orchard", 3.0, 0.0), &park_type())
        .unwrap();
    repo.add(&["parks/2"]).unwrap();

    let status = repo.status().unwrap();
    assert_eq!(status.staged.len(), 1);
    assert_eq!(status.staged[0].to_string(), "A parks/2");
    assert_eq!(status.unstaged.len(), 1);

    let id = repo.commit("lakeside").unwrap();
    assert!(repo.resolve_node(&format!("{}:parks/2", id.to_hex())).is_ok());
    assert!(repo.resolve_node("HEAD:parks/3").is_err());
    assert!(repo.resolve_node("WORK_HEAD:parks/3").is_ok());
    assert!(repo.is_dirty().unwrap());
}

#[test]
fn conflicts_listing_filters_by_path() {
    let repo = repo();
    commit_parks(&repo, &["1", "2", "3"], "base");
    repo.create_branch("b2", None, false).unwrap();
    switch(&repo, "b2");
    edit_park(&repo, "1", "west", "b2 renames 1");
    edit_park(&repo, "2", "east", "b2 renames 2");
    switch(&repo, "master");
    edit_park(&repo, "1", "north", "master renames 1");
    edit_park(&repo, "2", "south", "master renames 2");
    repo.merge("b2", &BranchMergeOptions::default()).unwrap();

    let all = repo.conflicts("", false).unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].conflict.path, "parks/1");
    let Some(RevObject::Feature(theirs)) = &all[0].theirs else {
        panic!("expected their feature");
    };
    assert_eq!(theirs.values[0], gvc_store::Value::Text("west".into()));
    assert!(all[0].ancestor.is_some() && all[0].ours.is_some());

    let only = repo.conflicts("parks/2", true).unwrap();
    assert_eq!(only.len(), 1);
    assert!(only[0].ours.is_none() && only[0].theirs.is_none());
    assert_eq!(only[0].to_string(), only[0].conflict.to_string());
    assert!(repo.conflicts("roads", false).unwrap().is_empty());
}
