//! Branch and tag management.

use gvc_refs::{names, RefError, RefValue};
use gvc_store::{ObjectStoreExt, RevTag};
use gvc_types::ObjectId;
use tracing::info;

use crate::context::RepoContext;
use crate::error::{RepoError, RepoResult};

impl RepoContext {
    /// Create branch `name` at `start` (default `HEAD`). An existing branch
    /// is moved only with `force`.
    pub fn create_branch(&self, name: &str, start: Option<&str>, force: bool) -> RepoResult<ObjectId> {
        names::validate_branch_name(name)?;
        let target = self.resolve_commit(start.unwrap_or(names::HEAD))?;
        let full = names::branch_ref(name);
        let current = self.refs().read(&full)?;
        if current.is_some() && !force {
            return Err(RefError::AlreadyExists { name: full }.into());
        }
        self.refs()
            .compare_and_swap(&full, current.as_ref(), Some(RefValue::Direct(target)))?;
        info!(branch = name, commit = %target.short_hex(), "branch created");
        Ok(target)
    }

    /// Delete a local branch other than the checked-out one. Returns the
    /// commit it pointed at.
    pub fn delete_branch(&self, name: &str) -> RepoResult<ObjectId> {
        if self.current_branch()?.as_deref() == Some(name) {
            return Err(RepoError::Precondition(format!(
                "cannot delete the checked-out branch {name}"
            )));
        }
        let full = names::branch_ref(name);
        let Some(current) = self.refs().read(&full)? else {
            return Err(RepoError::NotFound(full));
        };
        self.refs().compare_and_swap(&full, Some(&current), None)?;
        info!(branch = name, "branch deleted");
        current
            .as_direct()
            .ok_or_else(|| RepoError::InvalidArgument(format!("{name} is a symbolic ref")))
    }

    /// Local branches by short name.
    pub fn branches(&self) -> RepoResult<Vec<(String, ObjectId)>> {
        direct_refs(self.refs().branches()?)
    }

    /// Remote-tracking branches as `<remote>/<branch>`.
    pub fn remote_branches(&self) -> RepoResult<Vec<(String, ObjectId)>> {
        direct_refs(self.refs().list(names::REMOTES_PREFIX)?)
    }

    /// Create an annotated tag. Tags never move once created.
    pub fn create_tag(&self, name: &str, target: &str, message: &str) -> RepoResult<ObjectId> {
        names::validate_tag_name(name)?;
        let full = names::tag_ref(name);
        if self.refs().read(&full)?.is_some() {
            return Err(RefError::AlreadyExists { name: full }.into());
        }
        let commit = self.resolve_commit(target)?;
        let tag = RevTag::new(name, commit, message, self.config().signature());
        let id = self.store().put_tag(&tag)?;
        self.refs()
            .compare_and_swap(&full, None, Some(RefValue::Direct(id)))?;
        info!(tag = name, commit = %commit.short_hex(), "tag created");
        Ok(id)
    }

    /// Tags by short name with their tag objects.
    pub fn tags(&self) -> RepoResult<Vec<(String, RevTag)>> {
        direct_refs(self.refs().tags()?)?
            .into_iter()
            .map(|(name, id)| Ok((name, self.store().get_tag(&id)?)))
            .collect()
    }
}

fn direct_refs(refs: Vec<(String, RefValue)>) -> RepoResult<Vec<(String, ObjectId)>> {
    Ok(refs
        .into_iter()
        .filter_map(|(name, value)| {
            value
                .as_direct()
                .map(|id| (names::short_name(&name).to_string(), id))
        })
        .collect())
}
