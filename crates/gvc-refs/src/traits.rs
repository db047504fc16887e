//! The [`RefStore`] trait defining the reference storage interface.

use gvc_types::ObjectId;

use crate::error::{RefError, Result};
use crate::names::{self, HEAD, HEADS_PREFIX, REMOTES_PREFIX, TAGS_PREFIX};
use crate::types::{Head, RefValue};

/// Longest symbolic chain followed before giving up.
pub const MAX_SYMREF_DEPTH: usize = 8;

/// Storage backend for named references.
///
/// Implementations must be thread-safe (`Send + Sync`). The only mutation is
/// [`compare_and_swap`](RefStore::compare_and_swap): every write states the
/// value it expects to replace, so concurrent writers never silently
/// overwrite each other.
pub trait RefStore: Send + Sync {
    /// Read a ref by its full name. Returns `Ok(None)` if absent.
    fn read(&self, name: &str) -> Result<Option<RefValue>>;

    /// Atomically replace `expected` with `new`.
    ///
    /// `expected == None` requires the ref to be absent; `new == None`
    /// deletes it. Fails with [`RefError::CasMismatch`] if the current value
    /// differs from `expected`. Existing tags cannot be moved.
    fn compare_and_swap(
        &self,
        name: &str,
        expected: Option<&RefValue>,
        new: Option<RefValue>,
    ) -> Result<()>;

    /// All refs whose full name starts with `prefix`, sorted by name.
    fn list(&self, prefix: &str) -> Result<Vec<(String, RefValue)>>;

    /// Every ref in the store.
    fn snapshot(&self) -> Result<Vec<(String, RefValue)>> {
        self.list("")
    }

    /// Set a ref regardless of its current value.
    fn set(&self, name: &str, value: RefValue) -> Result<()> {
        let current = self.read(name)?;
        self.compare_and_swap(name, current.as_ref(), Some(value))
    }

    /// Delete a ref. Returns `true` if it existed.
    fn remove(&self, name: &str) -> Result<bool> {
        match self.read(name)? {
            Some(current) => {
                self.compare_and_swap(name, Some(&current), None)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Full name of the ref a chain of symbolic refs ends at.
    ///
    /// For an attached `HEAD` this is the branch ref, which may not exist
    /// yet. Chains longer than [`MAX_SYMREF_DEPTH`] are an error.
    fn resolve_name(&self, name: &str) -> Result<String> {
        let mut current = name.to_string();
        for _ in 0..=MAX_SYMREF_DEPTH {
            match self.read(&current)? {
                Some(RefValue::Symbolic(target)) => current = target,
                _ => return Ok(current),
            }
        }
        Err(RefError::SymrefDepthExceeded {
            name: name.to_string(),
        })
    }

    /// Object id a ref ultimately points at, `None` if absent or dangling.
    fn resolve(&self, name: &str) -> Result<Option<ObjectId>> {
        let target = self.resolve_name(name)?;
        Ok(self.read(&target)?.and_then(|v| v.as_direct()))
    }

    /// Like [`resolve`](RefStore::resolve) but absent refs are an error.
    fn resolve_required(&self, name: &str) -> Result<ObjectId> {
        self.resolve(name)?.ok_or_else(|| RefError::NotFound {
            name: name.to_string(),
        })
    }

    /// Current HEAD state, `None` before initialization.
    fn head(&self) -> Result<Option<Head>> {
        Ok(match self.read(HEAD)? {
            None => None,
            Some(RefValue::Direct(id)) => Some(Head::Detached(id)),
            Some(RefValue::Symbolic(target)) => Some(Head::Symbolic(
                target
                    .strip_prefix(HEADS_PREFIX)
                    .unwrap_or(&target)
                    .to_string(),
            )),
        })
    }

    /// Attach HEAD to a branch.
    fn set_head(&self, branch: &str) -> Result<()> {
        names::validate_branch_name(branch)?;
        self.set(HEAD, RefValue::Symbolic(names::branch_ref(branch)))
    }

    /// Detach HEAD at a commit.
    fn set_head_detached(&self, commit: ObjectId) -> Result<()> {
        self.set(HEAD, RefValue::Direct(commit))
    }

    fn branches(&self) -> Result<Vec<(String, RefValue)>> {
        self.list(HEADS_PREFIX)
    }

    fn tags(&self) -> Result<Vec<(String, RefValue)>> {
        self.list(TAGS_PREFIX)
    }

    /// All known remote names.
    fn remotes(&self) -> Result<Vec<String>> {
        let mut remotes: Vec<String> = self
            .list(REMOTES_PREFIX)?
            .iter()
            .filter_map(|(name, _)| names::parse_remote_ref(name))
            .map(|(remote, _)| remote.to_string())
            .collect();
        remotes.sort();
        remotes.dedup();
        Ok(remotes)
    }
}
