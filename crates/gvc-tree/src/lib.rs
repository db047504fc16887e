//! Revision trees for GVC.
//!
//! A revision tree is an immutable, content-addressed hierarchy of named
//! nodes. Small levels are stored as sorted leaves; a level that grows past
//! [`TreeConfig::normalized_size_limit`] entries is split into up to
//! [`MAX_BUCKETS`] hash buckets (recursively, one name-hash byte per depth),
//! which keeps edits logarithmic for layers with millions of features.
//!
//! # Key Types
//!
//! - [`TreeEditor`] -- lookup, edit and walk trees in an object store
//! - [`NodeRef`] -- a node plus the path of the level holding it
//! - [`TreeConfig`] -- bucketing threshold

pub mod bucket;
pub mod editor;
pub mod error;
pub mod node;
pub mod path;

pub use bucket::{bucket_index, TreeConfig, MAX_BUCKETS, MAX_DEPTH};
pub use editor::TreeEditor;
pub use error::{TreeError, TreeResult};
pub use node::NodeRef;
