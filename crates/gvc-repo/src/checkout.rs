//! Checkout: switching branches and restoring paths.
//!
//! Switching moves `HEAD` and resets the working tree and staging area to
//! the target commit's tree. Restoring paths leaves `HEAD` alone and copies
//! nodes from the staging area, a named tree-ish, or one side of a pending
//! merge into the working tree.

use std::fmt;

use gvc_diff::DiffEntry;
use gvc_refs::{names, RefValue};
use gvc_tree::path;
use gvc_types::ObjectId;
use tracing::info;

use crate::context::RepoContext;
use crate::error::{RepoError, RepoResult};

#[derive(Clone, Debug, Default)]
pub struct CheckoutOptions {
    /// Branch, remote branch or revision to switch to, or the tree-ish paths
    /// are restored from.
    pub source: Option<String>,
    pub paths: Vec<String>,
    /// Discard local changes and merge state.
    pub force: bool,
    /// Restore paths from `ORIG_HEAD`, our side of the merge.
    pub ours: bool,
    /// Restore paths from `MERGE_HEAD`, their side of the merge.
    pub theirs: bool,
}

impl CheckoutOptions {
    pub fn branch(source: impl Into<String>) -> Self {
        Self {
            source: Some(source.into()),
            ..Self::default()
        }
    }

    pub fn paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn force(mut self) -> Self {
        self.force = true;
        self
    }

    pub fn ours(mut self) -> Self {
        self.ours = true;
        self
    }

    pub fn theirs(mut self) -> Self {
        self.theirs = true;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CheckoutKind {
    CheckoutLocalBranch,
    CheckoutRemoteBranch,
    UpdateObjects,
    DetachedHead,
}

impl fmt::Display for CheckoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::CheckoutLocalBranch => "CHECKOUT_LOCAL_BRANCH",
            Self::CheckoutRemoteBranch => "CHECKOUT_REMOTE_BRANCH",
            Self::UpdateObjects => "UPDATE_OBJECTS",
            Self::DetachedHead => "DETACHED_HEAD",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckoutResult {
    pub kind: CheckoutKind,
    /// Full name of the ref `HEAD` ends at, `None` when detached.
    pub new_ref: Option<String>,
    /// Commit `HEAD` points at afterwards, null on an unborn branch.
    pub oid: ObjectId,
    /// Set when a local branch was created from a remote one.
    pub remote_name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CheckoutFailure {
    #[error("working tree and index are not clean; use force to overwrite local changes")]
    LocalChangesNotCommitted,

    #[error("unmerged paths: {}", .0.join(", "))]
    UnmergedPaths(Vec<String>),
}

/// What a branch switch lands on.
enum SwitchTarget {
    Local { branch: String, commit: ObjectId },
    Remote { remote: String, branch: String, commit: ObjectId },
    Detached(ObjectId),
}

impl SwitchTarget {
    fn commit(&self) -> ObjectId {
        match self {
            Self::Local { commit, .. } | Self::Remote { commit, .. } | Self::Detached(commit) => *commit,
        }
    }
}

impl RepoContext {
    pub fn checkout(&self, options: &CheckoutOptions) -> RepoResult<CheckoutResult> {
        if options.ours && options.theirs {
            return Err(RepoError::InvalidArgument(
                "ours and theirs are mutually exclusive".into(),
            ));
        }
        if !options.paths.is_empty() {
            return self.checkout_paths(options);
        }
        let Some(source) = options.source.as_deref() else {
            return Err(RepoError::InvalidArgument("no branch or paths specified".into()));
        };
        if options.ours || options.theirs {
            return Err(RepoError::InvalidArgument(
                "ours and theirs only apply to paths".into(),
            ));
        }
        self.switch(source, options.force)
    }

    fn checkout_paths(&self, options: &CheckoutOptions) -> RepoResult<CheckoutResult> {
        let stage = self.stage();
        let work = self.work();
        let paths: Vec<&str> = options
            .paths
            .iter()
            .map(|p| p.trim_matches(path::SEPARATOR))
            .collect();
        if paths.iter().any(|p| p.is_empty()) {
            return Err(RepoError::InvalidArgument("empty path".into()));
        }

        let merge_side = options.ours || options.theirs;
        if !merge_side && !options.force {
            let mut unmerged = Vec::new();
            for p in &paths {
                unmerged.extend(stage.conflicts(p)?.into_iter().map(|c| c.path));
            }
            if !unmerged.is_empty() {
                return Err(CheckoutFailure::UnmergedPaths(unmerged).into());
            }
        }

        let source_tree = if merge_side {
            let side = if options.ours { names::ORIG_HEAD } else { names::MERGE_HEAD };
            if self.refs().read(names::MERGE_HEAD)?.is_none() {
                return Err(RepoError::Precondition("no merge in progress".into()));
            }
            let commit = self
                .refs()
                .resolve(side)?
                .ok_or_else(|| RepoError::NotFound(side.into()))?;
            self.commit_tree(&commit)?
        } else {
            match options.source.as_deref() {
                Some(source) => self.resolve_treeish(source)?,
                None => stage.tree_id()?,
            }
        };
        // Nodes from anything but the staging area are staged as well.
        let to_stage = merge_side || options.source.is_some();

        let editor = self.editor();
        let mut found = Vec::with_capacity(paths.len());
        for p in &paths {
            let node = editor.lookup(&source_tree, p)?;
            if node.is_none() && !merge_side {
                return Err(RepoError::InvalidArgument(format!(
                    "path {p} did not match anything in the source"
                )));
            }
            found.push((*p, node));
        }

        for (p, node) in found {
            match &node {
                Some(n) => {
                    work.insert_node(&n.parent_path, n.node.clone())?;
                }
                None => {
                    work.delete(p)?;
                }
            }
            if to_stage {
                let staged = editor.lookup(&stage.tree_id()?, p)?;
                let entry = match (staged, node) {
                    (Some(old), Some(new)) => Some(DiffEntry::modified(old, new)),
                    (None, Some(new)) => Some(DiffEntry::added(new)),
                    (Some(old), None) => Some(DiffEntry::removed(old)),
                    (None, None) => None,
                };
                stage.stage(entry)?;
            }
            if merge_side {
                stage.resolve_under(p)?;
            }
        }

        let result = CheckoutResult {
            kind: CheckoutKind::UpdateObjects,
            new_ref: self.head_ref_name()?,
            oid: self.head_commit()?.unwrap_or_else(ObjectId::null),
            remote_name: None,
        };
        info!(
            kind = %result.kind,
            paths = paths.len(),
            side = if options.ours { "ours" } else if options.theirs { "theirs" } else { "index" },
            "checkout"
        );
        Ok(result)
    }

    fn switch(&self, source: &str, force: bool) -> RepoResult<CheckoutResult> {
        if !force {
            let unmerged = self.stage().conflicts("")?;
            if !unmerged.is_empty() {
                return Err(CheckoutFailure::UnmergedPaths(
                    unmerged.into_iter().map(|c| c.path).collect(),
                )
                .into());
            }
            if self.is_dirty()? {
                return Err(CheckoutFailure::LocalChangesNotCommitted.into());
            }
        }

        // Trees first: HEAD only moves once they match the target.
        let target = self.switch_target(source)?;
        self.reset_trees(self.commit_tree(&target.commit())?)?;
        if force {
            self.clear_merge_state()?;
        }
        let (kind, commit, remote_name) = match target {
            SwitchTarget::Local { branch, commit } => {
                self.refs().set_head(&branch)?;
                (CheckoutKind::CheckoutLocalBranch, commit, None)
            }
            SwitchTarget::Remote {
                remote,
                branch,
                commit,
            } => {
                self.refs().compare_and_swap(
                    &names::branch_ref(&branch),
                    None,
                    Some(RefValue::Direct(commit)),
                )?;
                self.refs().set_head(&branch)?;
                (CheckoutKind::CheckoutRemoteBranch, commit, Some(remote))
            }
            SwitchTarget::Detached(commit) => {
                self.refs().set_head_detached(commit)?;
                (CheckoutKind::DetachedHead, commit, None)
            }
        };

        let result = CheckoutResult {
            kind,
            new_ref: self.head_ref_name()?,
            oid: commit,
            remote_name,
        };
        info!(
            kind = %result.kind,
            commit = %commit.short_hex(),
            head_ref = result.new_ref.as_deref().unwrap_or(names::HEAD),
            "checkout"
        );
        Ok(result)
    }

    fn switch_target(&self, source: &str) -> RepoResult<SwitchTarget> {
        let refs = self.refs();
        let local = source.strip_prefix(names::HEADS_PREFIX).unwrap_or(source);
        if let Some(commit) = refs.resolve(&names::branch_ref(local))? {
            return Ok(SwitchTarget::Local {
                branch: local.to_string(),
                commit,
            });
        }

        let remote_candidates: Vec<(String, String, ObjectId)> = refs
            .list(names::REMOTES_PREFIX)?
            .into_iter()
            .filter_map(|(name, value)| {
                let (remote, branch) = names::parse_remote_ref(&name)?;
                let matches = source == format!("{remote}/{branch}") || source == branch;
                let commit = value.as_direct()?;
                matches.then(|| (remote.to_string(), branch.to_string(), commit))
            })
            .collect();
        match remote_candidates.as_slice() {
            [] => {}
            [(remote, branch, commit)] => {
                if refs.read(&names::branch_ref(branch))?.is_some() {
                    // A local branch of that name exists: look at the remote
                    // tip without touching it.
                    return Ok(SwitchTarget::Detached(*commit));
                }
                return Ok(SwitchTarget::Remote {
                    remote: remote.clone(),
                    branch: branch.clone(),
                    commit: *commit,
                });
            }
            many => {
                let listed: Vec<String> = many.iter().map(|(r, b, _)| format!("{r}/{b}")).collect();
                return Err(RepoError::InvalidArgument(format!(
                    "{source} is ambiguous: {}",
                    listed.join(", ")
                )));
            }
        }

        Ok(SwitchTarget::Detached(self.resolve_commit(source)?))
    }

    /// Full name of the branch `HEAD` is attached to.
    fn head_ref_name(&self) -> RepoResult<Option<String>> {
        Ok(match self.refs().read(names::HEAD)? {
            Some(RefValue::Symbolic(target)) => Some(target),
            _ => None,
        })
    }
}
