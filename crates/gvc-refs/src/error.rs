//! Error types for reference operations.

use thiserror::Error;

use crate::types::RefValue;

/// Errors that can occur during reference operations.
#[derive(Debug, Error)]
pub enum RefError {
    /// The reference was not found.
    #[error("ref not found: {name}")]
    NotFound { name: String },

    /// A reference with this name already exists.
    #[error("ref already exists: {name}")]
    AlreadyExists { name: String },

    /// The ref name is invalid.
    #[error("invalid ref name: {name}: {reason}")]
    InvalidName { name: String, reason: String },

    /// The ref did not hold the expected value at update time.
    #[error("ref {name} changed concurrently: expected {expected:?}, found {actual:?}")]
    CasMismatch {
        name: String,
        expected: Option<RefValue>,
        actual: Option<RefValue>,
    },

    /// A tag is immutable and cannot be moved.
    #[error("tag is immutable: {name}")]
    TagImmutable { name: String },

    /// Symbolic refs chained deeper than the resolution limit (or in a cycle).
    #[error("symbolic ref chain too deep starting at {name}")]
    SymrefDepthExceeded { name: String },

    /// A lock guarding ref state was poisoned.
    #[error("ref store lock poisoned")]
    LockPoisoned,
}

/// Convenience type alias for ref operations.
pub type Result<T> = std::result::Result<T, RefError>;
