//! Well-known ref names and name validation.
//!
//! Branch, tag and remote names follow git-style rules: non-empty, no
//! whitespace or `~ ^ : ? * [ \`, no `..` or `@{`, no leading/trailing `.` or
//! `/`, no `.lock` suffix, and no empty or dot-leading path components.

use crate::error::{RefError, Result};

pub const HEAD: &str = "HEAD";
/// Our side of an in-progress merge.
pub const ORIG_HEAD: &str = "ORIG_HEAD";
/// Their side of an in-progress merge.
pub const MERGE_HEAD: &str = "MERGE_HEAD";
/// Root tree of the working tree.
pub const WORK_HEAD: &str = "WORK_HEAD";
/// Root tree of the staging index.
pub const STAGE_HEAD: &str = "STAGE_HEAD";
/// Blob holding the unresolved conflicts of an in-progress merge.
pub const MERGE_CONFLICTS: &str = "MERGE_CONFLICTS";

pub const HEADS_PREFIX: &str = "refs/heads/";
pub const TAGS_PREFIX: &str = "refs/tags/";
pub const REMOTES_PREFIX: &str = "refs/remotes/";

/// Refs that live outside `refs/`.
pub const SPECIAL_REFS: [&str; 6] = [
    HEAD,
    ORIG_HEAD,
    MERGE_HEAD,
    WORK_HEAD,
    STAGE_HEAD,
    MERGE_CONFLICTS,
];

const FORBIDDEN_CHARS: &[char] = &[' ', '\t', '\n', '\r', '~', '^', ':', '?', '*', '[', '\\'];

pub fn branch_ref(branch: &str) -> String {
    format!("{HEADS_PREFIX}{branch}")
}

pub fn tag_ref(tag: &str) -> String {
    format!("{TAGS_PREFIX}{tag}")
}

pub fn remote_ref(remote: &str, branch: &str) -> String {
    format!("{REMOTES_PREFIX}{remote}/{branch}")
}

/// Strip the namespace prefix: `refs/heads/b2` -> `b2`,
/// `refs/remotes/origin/b2` -> `origin/b2`.
pub fn short_name(full: &str) -> &str {
    full.strip_prefix(HEADS_PREFIX)
        .or_else(|| full.strip_prefix(TAGS_PREFIX))
        .or_else(|| full.strip_prefix(REMOTES_PREFIX))
        .unwrap_or(full)
}

/// Split `refs/remotes/<remote>/<branch>` into its parts.
pub fn parse_remote_ref(full: &str) -> Option<(&str, &str)> {
    full.strip_prefix(REMOTES_PREFIX)?.split_once('/')
}

fn invalid(name: &str, reason: impl Into<String>) -> RefError {
    RefError::InvalidName {
        name: name.to_string(),
        reason: reason.into(),
    }
}

/// Validate a branch name.
///
/// ```
/// use gvc_refs::names::validate_branch_name;
///
/// assert!(validate_branch_name("master").is_ok());
/// assert!(validate_branch_name("edits/parks").is_ok());
/// assert!(validate_branch_name("").is_err());
/// assert!(validate_branch_name("bad..name").is_err());
/// ```
pub fn validate_branch_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(invalid(name, "must not be empty"));
    }
    if let Some(ch) = name.chars().find(|c| FORBIDDEN_CHARS.contains(c)) {
        return Err(invalid(name, format!("contains forbidden character {ch:?}")));
    }
    for (pattern, reason) in [("..", "must not contain '..'"), ("@{", "must not contain '@{'")] {
        if name.contains(pattern) {
            return Err(invalid(name, reason));
        }
    }
    if name.ends_with('.') || name.ends_with('/') || name.starts_with('/') {
        return Err(invalid(name, "must not start with '/' or end with '.' or '/'"));
    }
    if name.ends_with(".lock") {
        return Err(invalid(name, "must not end with '.lock'"));
    }
    if let Some(component) = name
        .split('/')
        .find(|c| c.is_empty() || c.starts_with('.'))
    {
        return Err(invalid(
            name,
            format!("path component {component:?} is empty or starts with '.'"),
        ));
    }
    Ok(())
}

/// Validate a tag name. Same rules as branch names.
pub fn validate_tag_name(name: &str) -> Result<()> {
    validate_branch_name(name)
}

/// Validate a remote name: a branch-valid name without slashes.
pub fn validate_remote_name(name: &str) -> Result<()> {
    if name.contains('/') {
        return Err(invalid(name, "remote name must not contain '/'"));
    }
    validate_branch_name(name)
}

/// Validate a full ref name: either a special ref or a valid name below
/// `refs/`.
pub fn validate_ref_name(full: &str) -> Result<()> {
    if SPECIAL_REFS.contains(&full) {
        return Ok(());
    }
    match full.strip_prefix("refs/") {
        Some(rest) => validate_branch_name(rest),
        None => Err(invalid(full, "must be a special ref or start with 'refs/'")),
    }
}
