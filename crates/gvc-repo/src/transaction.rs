//! Transactions: isolated ref namespaces published back by CAS.
//!
//! A [`Transaction`] starts from a copy of the repository's refs (conflict
//! index included) and shares the object store. Everything done through it
//! (checkout, add, commit, merge) only moves the transaction's own refs.
//! [`Transaction::commit`] then publishes changed branches: a plain
//! fast-forward when the repository branch has not moved, otherwise the
//! transaction's commits are replayed on top of the repository tip.
//!
//! Publishing is all or nothing. Every ref write is planned (replays
//! included) before the first one lands, and a write that loses a race
//! rolls back the ones before it.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Deref;
use std::sync::Arc;

use gvc_merge::{merge_trees, MergeOptions};
use gvc_refs::{names, InMemoryRefStore, RefError, RefValue};
use gvc_store::{ObjectStoreExt, RevCommit, RevTree};
use gvc_types::ObjectId;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::context::RepoContext;
use crate::error::{RepoError, RepoResult};
use crate::repository::Repository;

/// What [`Transaction::commit`] published.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransactionReport {
    /// Branches moved or created, by short name, with their new tips.
    pub branches: Vec<(String, ObjectId)>,
    pub deleted_branches: Vec<String>,
    pub tags: Vec<String>,
    /// Commits rewritten onto a repository tip that moved meanwhile.
    pub replayed: usize,
}

impl TransactionReport {
    pub fn is_empty(&self) -> bool {
        self.branches.is_empty() && self.deleted_branches.is_empty() && self.tags.is_empty()
    }
}

/// One repository ref write, with the value it replaces.
struct RefUpdate {
    name: String,
    expected: Option<RefValue>,
    new: Option<RefValue>,
}

/// The repository's working tree and staging area, as read while planning,
/// moving to the new tip of the checked-out branch.
struct TreeFollow {
    work: Option<RefValue>,
    stage: Option<RefValue>,
    tree: ObjectId,
}

struct PublishPlan {
    updates: Vec<RefUpdate>,
    follow: Option<TreeFollow>,
    report: TransactionReport,
}

pub struct Transaction<'r> {
    id: Uuid,
    repo: &'r Repository,
    ctx: RepoContext,
    begin: BTreeMap<String, RefValue>,
}

impl<'r> Transaction<'r> {
    pub(crate) fn begin(repo: &'r Repository) -> RepoResult<Self> {
        let snapshot = repo.refs().snapshot()?;
        let refs = InMemoryRefStore::from_snapshot(snapshot.iter().cloned());
        let ctx = RepoContext::new(repo.shared_store(), Arc::new(refs), repo.config().clone());
        let id = Uuid::now_v7();
        debug!(tx = %id, refs = snapshot.len(), "transaction started");
        Ok(Self {
            id,
            repo,
            ctx,
            begin: snapshot.into_iter().collect(),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Drop the transaction. Objects it wrote stay in the store unreferenced.
    pub fn abort(self) {
        info!(tx = %self.id, "transaction aborted");
    }

    /// Publish branch and tag changes to the repository.
    ///
    /// Fails with [`RepoError::Conflict`] when replaying onto a moved branch
    /// conflicts. On any failure no repository ref is left changed.
    pub fn commit(self) -> RepoResult<TransactionReport> {
        let max_retries = self.ctx.config().transaction.max_retries;
        let mut attempt = 0;
        loop {
            let plan = self.plan()?;
            match self.apply(&plan.updates) {
                Ok(()) => {}
                Err(RefError::CasMismatch { name, .. }) if attempt < max_retries => {
                    attempt += 1;
                    warn!(tx = %self.id, ref_name = %name, attempt, "ref moved during publish, retrying");
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
            if let Some(follow) = &plan.follow {
                self.follow(follow)?;
            }

            let report = plan.report;
            info!(
                tx = %self.id,
                branches = report.branches.len(),
                deleted = report.deleted_branches.len(),
                tags = report.tags.len(),
                replayed = report.replayed,
                "transaction committed"
            );
            return Ok(report);
        }
    }

    /// Work out every ref write against the repository as it is now.
    /// Nothing is written except replayed commits.
    fn plan(&self) -> RepoResult<PublishPlan> {
        let repo = self.repo.context();
        let mut plan = PublishPlan {
            updates: Vec::new(),
            follow: None,
            report: TransactionReport::default(),
        };

        let current = self.ctx.refs().list(names::HEADS_PREFIX)?;
        let mut branches: BTreeSet<String> = current.iter().map(|(n, _)| n.clone()).collect();
        branches.extend(
            self.begin
                .keys()
                .filter(|n| n.starts_with(names::HEADS_PREFIX))
                .cloned(),
        );
        let current: BTreeMap<String, RefValue> = current.into_iter().collect();
        let checked_out = repo.refs().resolve_name(names::HEAD)?;

        for name in branches {
            let began = self.begin.get(&name);
            let now = current.get(&name);
            if began == now {
                continue;
            }
            let short = names::short_name(&name).to_string();
            let Some(value) = now else {
                plan.updates.push(RefUpdate {
                    name,
                    expected: began.cloned(),
                    new: None,
                });
                plan.report.deleted_branches.push(short);
                continue;
            };
            let tip = value
                .as_direct()
                .ok_or_else(|| RepoError::InvalidArgument(format!("{name} is a symbolic ref")))?;

            let published = repo.refs().read(&name)?;
            let (new_tip, replayed) = self.publish_tip(&name, began, published.as_ref(), tip)?;
            plan.report.replayed += replayed;
            plan.report.branches.push((short, new_tip));
            if published.as_ref().and_then(RefValue::as_direct) == Some(new_tip) {
                continue;
            }
            if name == checked_out {
                plan.follow = self.tree_follow(published.as_ref(), new_tip)?;
            }
            plan.updates.push(RefUpdate {
                name,
                expected: published,
                new: Some(RefValue::Direct(new_tip)),
            });
        }

        for (name, value) in self.ctx.refs().list(names::TAGS_PREFIX)? {
            if self.begin.contains_key(&name) {
                continue;
            }
            let short = names::short_name(&name).to_string();
            if repo.refs().read(&name)?.is_some() {
                return Err(RepoError::Precondition(format!("tag {short} already exists")));
            }
            plan.updates.push(RefUpdate {
                name,
                expected: None,
                new: Some(value),
            });
            plan.report.tags.push(short);
        }
        Ok(plan)
    }

    /// The tip repository branch `name` moves to so that it includes
    /// `tip`, and the number of commits replayed to get there.
    fn publish_tip(
        &self,
        name: &str,
        began: Option<&RefValue>,
        published: Option<&RefValue>,
        tip: ObjectId,
    ) -> RepoResult<(ObjectId, usize)> {
        let onto = match published.and_then(RefValue::as_direct) {
            _ if published == began => return Ok((tip, 0)),
            None => return Ok((tip, 0)),
            Some(onto) => onto,
        };
        let graph = self.ctx.graph(&[onto, tip])?;
        if graph.is_ancestor(&tip, &onto)? {
            debug!(branch = name, "transaction tip already published");
            return Ok((onto, 0));
        }
        if graph.is_ancestor(&onto, &tip)? {
            return Ok((tip, 0));
        }
        let base = graph.merge_base(&onto, &tip)?;
        let commits = graph.commits_between(base.as_ref(), &tip)?;
        let rewritten = self.replay(onto, &commits)?;
        debug!(branch = name, replayed = commits.len(), "transaction commits replayed");
        Ok((rewritten, commits.len()))
    }

    /// Trees of a clean repository follow its checked-out branch; a dirty
    /// repository keeps its local changes.
    fn tree_follow(
        &self,
        published: Option<&RefValue>,
        new_tip: ObjectId,
    ) -> RepoResult<Option<TreeFollow>> {
        let repo = self.repo.context();
        let work = repo.refs().read(names::WORK_HEAD)?;
        let stage = repo.refs().read(names::STAGE_HEAD)?;
        let tree_of = |v: Option<&RefValue>| v.and_then(RefValue::as_direct).unwrap_or_else(RevTree::empty_id);
        let head_tree = match published.and_then(RefValue::as_direct) {
            Some(commit) => repo.commit_tree(&commit)?,
            None => RevTree::empty_id(),
        };
        if tree_of(work.as_ref()) != head_tree || tree_of(stage.as_ref()) != head_tree {
            return Ok(None);
        }
        Ok(Some(TreeFollow {
            work,
            stage,
            tree: repo.commit_tree(&new_tip)?,
        }))
    }

    /// Write `updates` in order. If one fails, the ones already written are
    /// swapped back before the error is returned.
    fn apply(&self, updates: &[RefUpdate]) -> Result<(), RefError> {
        let refs = self.repo.refs();
        for (i, update) in updates.iter().enumerate() {
            let written = refs.compare_and_swap(&update.name, update.expected.as_ref(), update.new.clone());
            let Err(e) = written else {
                continue;
            };
            for done in updates[..i].iter().rev() {
                if let Err(undo) =
                    refs.compare_and_swap(&done.name, done.new.as_ref(), done.expected.clone())
                {
                    warn!(tx = %self.id, ref_name = %done.name, error = %undo, "rollback failed");
                }
            }
            debug!(tx = %self.id, rolled_back = i, "publish rolled back");
            return Err(e);
        }
        Ok(())
    }

    /// Move the repository's staging area and working tree to the new tip,
    /// unless either changed since it was planned.
    fn follow(&self, follow: &TreeFollow) -> RepoResult<()> {
        let refs = self.repo.refs();
        let new = RefValue::Direct(follow.tree);
        let moved = refs
            .compare_and_swap(names::STAGE_HEAD, follow.stage.as_ref(), Some(new.clone()))
            .and_then(|()| {
                refs.compare_and_swap(names::WORK_HEAD, follow.work.as_ref(), Some(new.clone()))
                    .inspect_err(|_| {
                        if let Err(undo) =
                            refs.compare_and_swap(names::STAGE_HEAD, Some(&new), follow.stage.clone())
                        {
                            warn!(tx = %self.id, error = %undo, "stage rollback failed");
                        }
                    })
            });
        match moved {
            Ok(()) => {
                debug!(tx = %self.id, tree = %follow.tree.short_hex(), "repository trees followed");
                Ok(())
            }
            Err(RefError::CasMismatch { name, .. }) => {
                warn!(tx = %self.id, ref_name = %name, "repository tree changed during publish, left alone");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Rewrite `commits` (parents first) on top of `onto`, keeping authors
    /// and messages.
    fn replay(&self, mut onto: ObjectId, commits: &[ObjectId]) -> RepoResult<ObjectId> {
        let store = self.ctx.store();
        let committer = self.ctx.config().signature();
        for id in commits {
            let commit = store.get_commit(id)?;
            let base_tree = match commit.first_parent() {
                Some(parent) => self.ctx.commit_tree(&parent)?,
                None => RevTree::empty_id(),
            };
            let onto_tree = self.ctx.commit_tree(&onto)?;
            let merged = merge_trees(
                store,
                self.ctx.config().tree,
                &base_tree,
                &onto_tree,
                &commit.tree_id,
                &MergeOptions::default(),
            )?;
            if !merged.is_clean() {
                warn!(
                    tx = %self.id,
                    commit = %id.short_hex(),
                    conflicts = merged.conflicts.len(),
                    "replay conflicts"
                );
                return Err(RepoError::Conflict(merged.conflicts));
            }
            let parents = std::iter::once(onto)
                .chain(commit.parents.iter().skip(1).copied())
                .collect();
            let rewritten = RevCommit::new(
                merged.merged_tree,
                parents,
                commit.author.clone(),
                committer.clone(),
                commit.message.as_str(),
            );
            onto = store.put_commit(&rewritten)?;
            debug!(from = %id.short_hex(), to = %onto.short_hex(), "commit replayed");
        }
        Ok(onto)
    }
}

impl Deref for Transaction<'_> {
    type Target = RepoContext;

    fn deref(&self) -> &RepoContext {
        &self.ctx
    }
}
