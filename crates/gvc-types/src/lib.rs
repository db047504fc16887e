//! Foundation types for GVC, the geospatial version-control engine.
//!
//! Every other GVC crate depends on `gvc-types`.
//!
//! # Key Types
//!
//! - [`ObjectId`] -- Content-addressed identifier (BLAKE3 hash)
//! - [`Envelope`] -- Axis-aligned bounding box over geometries
//! - [`Person`] -- Author/committer signature with timestamp

pub mod envelope;
pub mod error;
pub mod object;
pub mod person;

pub use envelope::Envelope;
pub use error::TypeError;
pub use object::ObjectId;
pub use person::Person;
