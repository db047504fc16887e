//! Conflict records and the per-context conflict index.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use gvc_tree::path;
use gvc_types::ObjectId;
use serde::{Deserialize, Serialize};

use crate::error::{MergeError, MergeResult};

/// A path both sides of a merge changed differently.
///
/// A null id means the node is absent on that side.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Conflict {
    pub path: String,
    pub ancestor: ObjectId,
    pub ours: ObjectId,
    pub theirs: ObjectId,
}

impl Conflict {
    pub fn new(path: impl Into<String>, ancestor: ObjectId, ours: ObjectId, theirs: ObjectId) -> Self {
        Self {
            path: path.into(),
            ancestor,
            ours,
            theirs,
        }
    }

    /// One side deleted the node while the other changed it.
    pub fn is_delete_modify(&self) -> bool {
        self.ours.is_null() != self.theirs.is_null()
    }
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} {}", self.path, self.ancestor, self.ours, self.theirs)
    }
}

impl FromStr for Conflict {
    type Err = MergeError;

    /// Parse the four-field form written by `Display`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split_whitespace().collect();
        let [p, ancestor, ours, theirs] = fields.as_slice() else {
            return Err(MergeError::InvalidConflict(s.to_string()));
        };
        let parse = |hex: &str| {
            ObjectId::from_hex(hex).map_err(|e| MergeError::InvalidConflict(format!("{s}: {e}")))
        };
        Ok(Self::new(*p, parse(ancestor)?, parse(ours)?, parse(theirs)?))
    }
}

/// Unresolved conflicts keyed by path.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConflictIndex {
    conflicts: BTreeMap<String, Conflict>,
}

impl ConflictIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.conflicts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conflicts.is_empty()
    }

    /// Record a conflict, replacing any earlier one at the same path.
    pub fn insert(&mut self, conflict: Conflict) -> Option<Conflict> {
        self.conflicts.insert(conflict.path.clone(), conflict)
    }

    pub fn extend(&mut self, conflicts: impl IntoIterator<Item = Conflict>) {
        for conflict in conflicts {
            self.insert(conflict);
        }
    }

    pub fn get(&self, path: &str) -> Option<&Conflict> {
        self.conflicts.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.conflicts.contains_key(path)
    }

    pub fn remove(&mut self, path: &str) -> Option<Conflict> {
        self.conflicts.remove(path)
    }

    /// Conflicts at or under `prefix`; the empty prefix matches all.
    pub fn under(&self, prefix: &str) -> Vec<&Conflict> {
        self.conflicts
            .values()
            .filter(|c| path::is_at_or_under(&c.path, prefix))
            .collect()
    }

    /// Remove and return the conflicts at or under `prefix`.
    pub fn remove_under(&mut self, prefix: &str) -> Vec<Conflict> {
        let paths: Vec<String> = self.under(prefix).into_iter().map(|c| c.path.clone()).collect();
        paths.iter().filter_map(|p| self.conflicts.remove(p)).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Conflict> {
        self.conflicts.values()
    }

    pub fn paths(&self) -> Vec<String> {
        self.conflicts.keys().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.conflicts.clear();
    }

    /// JSON array of conflicts, sorted by path.
    pub fn to_json(&self) -> MergeResult<String> {
        let list: Vec<&Conflict> = self.conflicts.values().collect();
        Ok(serde_json::to_string_pretty(&list)?)
    }

    pub fn from_json(json: &str) -> MergeResult<Self> {
        let list: Vec<Conflict> = serde_json::from_str(json)?;
        let mut index = Self::new();
        index.extend(list);
        Ok(index)
    }
}

impl FromIterator<Conflict> for ConflictIndex {
    fn from_iter<I: IntoIterator<Item = Conflict>>(iter: I) -> Self {
        let mut index = Self::new();
        index.extend(iter);
        index
    }
}
