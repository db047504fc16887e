//! Commit graph for GVC.
//!
//! Provides an in-memory, id-indexed view of commit ancestry loaded from an
//! object store, used for merge-base search, fast-forward checks, history
//! walks and transaction replay.
//!
//! # Key Types
//!
//! - [`CommitGraph`] -- Arena of commits with ancestry queries
//! - [`CommitNode`] -- One commit's parents, time and generation
//! - [`DagError`] -- Error type for graph operations

pub mod error;
pub mod graph;
pub mod node;

pub use error::{DagError, DagResult};
pub use graph::CommitGraph;
pub use node::CommitNode;
