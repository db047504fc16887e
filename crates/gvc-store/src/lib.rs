//! Content-addressed object storage for GVC.
//!
//! Every piece of versioned data -- trees, features, feature types, commits,
//! tags -- is stored as an immutable object identified by the BLAKE3 hash of
//! its canonical encoding (domain-separated by object kind).
//!
//! # Object Types
//!
//! - [`RevTree`] -- one logical tree level, either a leaf or bucketed
//! - [`RevFeature`] -- positional attribute values of a single feature
//! - [`RevFeatureType`] -- the schema that names and types those values
//! - [`RevCommit`] -- root tree plus parents, author, committer and message
//! - [`RevTag`] -- annotated, immutable pointer at a commit
//! - [`RevBlob`] -- opaque bytes, used for repository bookkeeping
//!
//! [`RevObject`] is the sum over all of them.
//!
//! # Storage Backends
//!
//! All backends implement the [`ObjectStore`] trait; the typed layer
//! [`ObjectStoreExt`] is available on every backend:
//!
//! - [`InMemoryObjectStore`] -- `HashMap`-based store for tests and embedding
//! - [`FileObjectStore`] -- loose objects on disk, written atomically
//!
//! # Design Rules
//!
//! 1. Objects are immutable once written (content-addressing guarantees this).
//! 2. Encoding is canonical: semantically equal objects encode identically.
//! 3. Every typed read rehashes the payload and rejects a mismatch.
//! 4. Concurrent reads are always safe; writes are idempotent.

pub mod commit;
pub mod error;
pub mod feature;
pub mod file;
pub mod hasher;
pub mod memory;
pub mod object;
pub mod traits;
pub mod tree;

pub use commit::{RevCommit, RevTag};
pub use error::{StoreError, StoreResult};
pub use feature::{AttributeDescriptor, Coord, Geometry, RevFeature, RevFeatureType, Value, ValueKind};
pub use file::FileObjectStore;
pub use hasher::ContentHasher;
pub use memory::InMemoryObjectStore;
pub use object::{ObjectKind, RevBlob, RevObject, StoredObject};
pub use traits::{ObjectStore, ObjectStoreExt};
pub use tree::{Bucket, Node, NodeKind, RevTree};
