//! Core reference types.
//!
//! A ref either names an object directly or points symbolically at another
//! ref, the way `HEAD` names the checked-out branch.

use std::fmt;

use gvc_types::ObjectId;
use serde::{Deserialize, Serialize};

/// The value stored under a ref name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RefValue {
    /// Points straight at an object (commit or tree).
    Direct(ObjectId),
    /// Points at another ref by full name.
    Symbolic(String),
}

impl RefValue {
    pub fn as_direct(&self) -> Option<ObjectId> {
        match self {
            Self::Direct(id) => Some(*id),
            Self::Symbolic(_) => None,
        }
    }

    pub fn as_symbolic(&self) -> Option<&str> {
        match self {
            Self::Direct(_) => None,
            Self::Symbolic(target) => Some(target),
        }
    }

    pub fn is_symbolic(&self) -> bool {
        matches!(self, Self::Symbolic(_))
    }
}

impl fmt::Display for RefValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct(id) => write!(f, "{id}"),
            Self::Symbolic(target) => write!(f, "ref: {target}"),
        }
    }
}

/// A named ref and its value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ref {
    pub name: String,
    pub value: RefValue,
}

impl Ref {
    pub fn new(name: impl Into<String>, value: RefValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// The state of HEAD: attached to a branch or detached at a commit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Head {
    /// HEAD points to `refs/heads/<name>`; the branch may not exist yet.
    Symbolic(String),
    /// HEAD points directly at a commit.
    Detached(ObjectId),
}
