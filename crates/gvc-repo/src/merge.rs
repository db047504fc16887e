//! Merging another branch into `HEAD`.

use gvc_merge::{merge_trees, Conflict, MergeOptions, MergeStrategy};
use gvc_refs::{names, RefValue};
use gvc_store::{ObjectStoreExt, RevCommit, RevTree};
use gvc_types::ObjectId;
use tracing::info;

use crate::checkout::CheckoutFailure;
use crate::context::RepoContext;
use crate::error::{RepoError, RepoResult};

/// Options for [`RepoContext::merge`].
#[derive(Clone, Debug, Default)]
pub struct BranchMergeOptions {
    /// Always create a merge commit, even when a fast-forward is possible.
    pub no_ff: bool,
    pub strategy: MergeStrategy,
    /// Merge commit message; a summary of the merge by default.
    pub message: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum MergeOutcome {
    /// `HEAD` already contains the other commit.
    UpToDate,
    FastForward { commit: ObjectId },
    Merged { commit: ObjectId },
    /// The merge stopped; the partially merged tree is in the working tree
    /// and staging area and the conflicts are recorded.
    Conflicted { conflicts: Vec<Conflict> },
}

impl RepoContext {
    /// Merge the commit named by `spec` into `HEAD`.
    pub fn merge(&self, spec: &str, options: &BranchMergeOptions) -> RepoResult<MergeOutcome> {
        let unmerged = self.stage().conflicts("")?;
        if !unmerged.is_empty() {
            return Err(RepoError::UnmergedPaths(
                unmerged.into_iter().map(|c| c.path).collect(),
            ));
        }
        if self.is_dirty()? {
            return Err(CheckoutFailure::LocalChangesNotCommitted.into());
        }

        let theirs = self.resolve_commit(spec)?;
        let target = self.refs().resolve_name(names::HEAD)?;
        let Some(ours) = self.head_commit()? else {
            // Unborn branch: adopt theirs.
            self.refs()
                .compare_and_swap(&target, None, Some(RefValue::Direct(theirs)))?;
            self.reset_trees(self.commit_tree(&theirs)?)?;
            info!(commit = %theirs.short_hex(), "merge fast-forwarded unborn branch");
            return Ok(MergeOutcome::FastForward { commit: theirs });
        };

        let graph = self.graph(&[ours, theirs])?;
        if graph.is_ancestor(&theirs, &ours)? {
            info!(theirs = %theirs.short_hex(), "already up to date");
            return Ok(MergeOutcome::UpToDate);
        }
        let ours_value = RefValue::Direct(ours);
        self.refs().set(names::ORIG_HEAD, ours_value.clone())?;

        if !options.no_ff && graph.is_ancestor(&ours, &theirs)? {
            self.refs()
                .compare_and_swap(&target, Some(&ours_value), Some(RefValue::Direct(theirs)))?;
            self.reset_trees(self.commit_tree(&theirs)?)?;
            info!(from = %ours.short_hex(), to = %theirs.short_hex(), "fast-forward merge");
            return Ok(MergeOutcome::FastForward { commit: theirs });
        }

        let base_tree = match graph.merge_base(&ours, &theirs)? {
            Some(base) => self.commit_tree(&base)?,
            None => RevTree::empty_id(),
        };
        let ours_tree = self.commit_tree(&ours)?;
        let theirs_tree = self.commit_tree(&theirs)?;
        let report = merge_trees(
            self.store(),
            self.config().tree,
            &base_tree,
            &ours_tree,
            &theirs_tree,
            &MergeOptions::with_strategy(options.strategy),
        )?;
        self.reset_trees(report.merged_tree)?;

        if !report.is_clean() {
            self.stage().record_conflicts(report.conflicts.iter().cloned())?;
            self.refs().set(names::MERGE_HEAD, RefValue::Direct(theirs))?;
            info!(conflicts = report.conflicts.len(), theirs = %theirs.short_hex(), "merge stopped on conflicts");
            return Ok(MergeOutcome::Conflicted {
                conflicts: report.conflicts,
            });
        }

        let message = options.message.clone().unwrap_or_else(|| {
            format!("Merge {spec} into {}", names::short_name(&target))
        });
        let signature = self.config().signature();
        let commit = RevCommit::new(
            report.merged_tree,
            vec![ours, theirs],
            signature.clone(),
            signature,
            message,
        );
        let id = self.store().put_commit(&commit)?;
        self.refs()
            .compare_and_swap(&target, Some(&ours_value), Some(RefValue::Direct(id)))?;
        info!(
            commit = %id.short_hex(),
            from_theirs = report.merged_from_theirs,
            "merge committed"
        );
        Ok(MergeOutcome::Merged { commit: id })
    }

    /// Abandon a conflicted merge: restore `ORIG_HEAD`'s tree and drop the
    /// merge state.
    pub fn merge_abort(&self) -> RepoResult<()> {
        if self.refs().read(names::MERGE_HEAD)?.is_none() {
            return Err(RepoError::Precondition("no merge in progress".into()));
        }
        let orig = self
            .refs()
            .resolve(names::ORIG_HEAD)?
            .ok_or_else(|| RepoError::NotFound(names::ORIG_HEAD.into()))?;
        self.reset_trees(self.commit_tree(&orig)?)?;
        self.clear_merge_state()?;
        info!(commit = %orig.short_hex(), "merge aborted");
        Ok(())
    }
}
