//! Slash-separated feature paths.

use crate::error::{TreeError, TreeResult};

pub const SEPARATOR: char = '/';

/// Join a parent path and a child name; an empty parent yields the name.
pub fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}{SEPARATOR}{name}")
    }
}

/// Split `path` into `(parent, name)`.
pub fn split_parent(path: &str) -> (&str, &str) {
    match path.rfind(SEPARATOR) {
        Some(i) => (&path[..i], &path[i + 1..]),
        None => ("", path),
    }
}

/// Validated path components. The empty path has none.
pub fn segments(path: &str) -> TreeResult<Vec<&str>> {
    if path.is_empty() {
        return Ok(Vec::new());
    }
    let parts: Vec<&str> = path.split(SEPARATOR).collect();
    if parts.iter().any(|p| p.is_empty()) {
        return Err(TreeError::InvalidPath(path.to_string()));
    }
    Ok(parts)
}

/// Returns `true` if `path` equals `prefix` or lies beneath it.
pub fn is_at_or_under(path: &str, prefix: &str) -> bool {
    prefix.is_empty()
        || path == prefix
        || (path.len() > prefix.len()
            && path.starts_with(prefix)
            && path[prefix.len()..].starts_with(SEPARATOR))
}

/// Returns `true` if `path` is a proper ancestor of `other`.
pub fn is_ancestor_of(path: &str, other: &str) -> bool {
    path != other && is_at_or_under(other, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_and_split() {
        assert_eq!(join("", "parks"), "parks");
        assert_eq!(join("parks", "1"), "parks/1");
        assert_eq!(split_parent("a/b/c"), ("a/b", "c"));
        assert_eq!(split_parent("c"), ("", "c"));
    }

    #[test]
    fn segments_rejects_empty_components() {
        assert_eq!(segments("a/b").unwrap(), vec!["a", "b"]);
        assert!(segments("").unwrap().is_empty());
        assert!(matches!(segments("a//b"), Err(TreeError::InvalidPath(_))));
        assert!(segments("/a").is_err());
        assert!(segments("a/").is_err());
    }

    #[test]
    fn prefix_matching_respects_separators() {
        assert!(is_at_or_under("parks/1", "parks"));
        assert!(is_at_or_under("parks", "parks"));
        assert!(!is_at_or_under("parksides/1", "parks"));
        assert!(is_at_or_under("anything", ""));
        assert!(is_ancestor_of("parks", "parks/1"));
        assert!(!is_ancestor_of("parks", "parks"));
    }
}
