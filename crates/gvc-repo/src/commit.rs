//! Recording the staging area as a commit.

use gvc_refs::{names, RefValue};
use gvc_store::{ObjectStoreExt, RevCommit};
use gvc_types::{ObjectId, Person};
use tracing::info;

use crate::context::RepoContext;
use crate::error::{RepoError, RepoResult};

#[derive(Clone, Debug, Default)]
pub struct CommitOptions {
    pub message: String,
    /// Record a commit even if the tree equals `HEAD`'s.
    pub allow_empty: bool,
    /// Defaults to the configured signature.
    pub author: Option<Person>,
}

impl CommitOptions {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn allow_empty(mut self) -> Self {
        self.allow_empty = true;
        self
    }

    pub fn with_author(mut self, author: Person) -> Self {
        self.author = Some(author);
        self
    }
}

impl RepoContext {
    pub fn commit(&self, message: &str) -> RepoResult<ObjectId> {
        self.commit_with(&CommitOptions::new(message))
    }

    /// Commit the staged tree on top of `HEAD`.
    ///
    /// Concludes a pending merge by adding `MERGE_HEAD` as second parent.
    /// Fails while conflicts are unresolved, and when nothing changed unless
    /// empty commits are allowed or a merge is concluded.
    pub fn commit_with(&self, options: &CommitOptions) -> RepoResult<ObjectId> {
        let stage = self.stage();
        let unmerged = stage.conflicts("")?;
        if !unmerged.is_empty() {
            return Err(RepoError::UnmergedPaths(
                unmerged.into_iter().map(|c| c.path).collect(),
            ));
        }

        let head = self.head_commit()?;
        let merge_head = self.refs().resolve(names::MERGE_HEAD)?;
        let tree = stage.tree_id()?;
        if tree == self.head_tree()? && merge_head.is_none() && !options.allow_empty {
            return Err(RepoError::Precondition("nothing to commit".into()));
        }

        let committer = self.config().signature();
        let author = options.author.clone().unwrap_or_else(|| committer.clone());
        let parents: Vec<ObjectId> = head.into_iter().chain(merge_head).collect();
        let commit = RevCommit::new(tree, parents, author, committer, options.message.as_str());
        let id = self.store().put_commit(&commit)?;

        // Moves the checked-out branch, or HEAD itself when detached.
        let target = self.refs().resolve_name(names::HEAD)?;
        let expected = head.map(RefValue::Direct);
        self.refs()
            .compare_and_swap(&target, expected.as_ref(), Some(RefValue::Direct(id)))?;
        self.refs().remove(names::MERGE_HEAD)?;
        info!(
            commit = %id.short_hex(),
            head_ref = %target,
            parents = commit.parents.len(),
            "committed"
        );
        Ok(id)
    }
}
