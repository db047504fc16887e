use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Axis-aligned bounding box in the coordinate space of a feature type.
///
/// An envelope is never empty: "no bounds" is modelled as `Option<Envelope>`
/// by callers, so a tree without geometries simply carries `None`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Envelope {
    /// Create an envelope, rejecting inverted or non-finite bounds.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Result<Self, TypeError> {
        if ![min_x, min_y, max_x, max_y].iter().all(|v| v.is_finite()) {
            return Err(TypeError::InvalidEnvelope(format!(
                "non-finite bound in ({min_x}, {min_y}, {max_x}, {max_y})"
            )));
        }
        if min_x > max_x || min_y > max_y {
            return Err(TypeError::InvalidEnvelope(format!(
                "min ({min_x}, {min_y}) exceeds max ({max_x}, {max_y})"
            )));
        }
        Ok(Self {
            min_x,
            min_y,
            max_x,
            max_y,
        })
    }

    /// Degenerate envelope covering a single coordinate.
    pub fn point(x: f64, y: f64) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        }
    }

    /// Smallest envelope covering every coordinate, or `None` for no input.
    pub fn from_coords<I>(coords: I) -> Option<Self>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        coords
            .into_iter()
            .map(|(x, y)| Self::point(x, y))
            .reduce(|acc, e| acc.union(&e))
    }

    /// Grow this envelope so it also covers `other`.
    pub fn expand_to_include(&mut self, other: &Envelope) {
        self.min_x = self.min_x.min(other.min_x);
        self.min_y = self.min_y.min(other.min_y);
        self.max_x = self.max_x.max(other.max_x);
        self.max_y = self.max_y.max(other.max_y);
    }

    pub fn union(&self, other: &Envelope) -> Envelope {
        let mut out = *self;
        out.expand_to_include(other);
        out
    }

    /// Merge two optional envelopes.
    pub fn union_opt(a: Option<Envelope>, b: Option<Envelope>) -> Option<Envelope> {
        match (a, b) {
            (Some(a), Some(b)) => Some(a.union(&b)),
            (a, None) => a,
            (None, b) => b,
        }
    }

    /// Returns `true` if the two boxes share at least one point.
    pub fn intersects(&self, other: &Envelope) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }

    /// Returns `true` if `other` lies entirely inside this envelope.
    pub fn contains(&self, other: &Envelope) -> bool {
        self.min_x <= other.min_x
            && self.min_y <= other.min_y
            && self.max_x >= other.max_x
            && self.max_y >= other.max_y
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}
