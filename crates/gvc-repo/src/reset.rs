//! Moving `HEAD` and optionally the staging area and working tree.

use gvc_refs::{names, RefValue};
use gvc_types::ObjectId;
use tracing::info;

use crate::context::RepoContext;
use crate::error::RepoResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResetMode {
    /// Move the branch only.
    Soft,
    /// Also reset the staging area.
    Mixed,
    /// Also reset the working tree.
    Hard,
}

impl RepoContext {
    /// Point the checked-out branch (or a detached `HEAD`) at `spec`.
    ///
    /// Mixed and hard resets also drop merge conflicts and `MERGE_HEAD`.
    pub fn reset(&self, spec: &str, mode: ResetMode) -> RepoResult<ObjectId> {
        let commit = self.resolve_commit(spec)?;
        let tree = self.commit_tree(&commit)?;
        if let Some(previous) = self.head_commit()? {
            self.refs().set(names::ORIG_HEAD, RefValue::Direct(previous))?;
        }
        let target = self.refs().resolve_name(names::HEAD)?;
        self.refs().set(&target, RefValue::Direct(commit))?;

        match mode {
            ResetMode::Soft => {}
            ResetMode::Mixed => {
                self.stage().update_stage_head(tree)?;
                self.clear_merge_state()?;
            }
            ResetMode::Hard => {
                self.reset_trees(tree)?;
                self.clear_merge_state()?;
            }
        }
        info!(commit = %commit.short_hex(), mode = ?mode, "reset");
        Ok(commit)
    }
}
