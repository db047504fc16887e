use serde::{Deserialize, Serialize};
use gvc_types::Envelope;

use crate::error::{StoreError, StoreResult};
use crate::object::{decode, encode, ObjectKind, StoredObject};

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// A single planar coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coord {
    pub x: f64,
    pub y: f64,
}

impl Coord {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn canonical(self) -> Self {
        Self::new(canonical_f64(self.x), canonical_f64(self.y))
    }
}

/// Collapse `-0.0` onto `0.0` and every NaN payload onto one quiet NaN.
fn canonical_f64(v: f64) -> f64 {
    if v == 0.0 {
        0.0
    } else if v.is_nan() {
        f64::NAN
    } else {
        v
    }
}

/// Minimal vector geometry model carried inside feature values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Geometry {
    Point(Coord),
    LineString(Vec<Coord>),
    /// Exterior ring first, then holes.
    Polygon(Vec<Vec<Coord>>),
    MultiPoint(Vec<Coord>),
}

impl Geometry {
    pub fn point(x: f64, y: f64) -> Self {
        Self::Point(Coord::new(x, y))
    }

    /// Bounding box of every coordinate, `None` for an empty geometry.
    pub fn envelope(&self) -> Option<Envelope> {
        let coords: Box<dyn Iterator<Item = &Coord> + '_> = match self {
            Self::Point(c) => Box::new(std::iter::once(c)),
            Self::LineString(cs) | Self::MultiPoint(cs) => Box::new(cs.iter()),
            Self::Polygon(rings) => Box::new(rings.iter().flatten()),
        };
        Envelope::from_coords(coords.map(|c| (c.x, c.y)))
    }

    /// The same geometry with every coordinate in canonical form.
    pub fn canonical(&self) -> Self {
        fn coords(cs: &[Coord]) -> Vec<Coord> {
            cs.iter().map(|c| c.canonical()).collect()
        }
        match self {
            Self::Point(c) => Self::Point(c.canonical()),
            Self::LineString(cs) => Self::LineString(coords(cs)),
            Self::MultiPoint(cs) => Self::MultiPoint(coords(cs)),
            Self::Polygon(rings) => Self::Polygon(rings.iter().map(|r| coords(r)).collect()),
        }
    }
}

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

/// The declared type of an attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Bool,
    Int,
    Float,
    Text,
    Geometry,
    Timestamp,
    Binary,
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Text => "text",
            Self::Geometry => "geometry",
            Self::Timestamp => "timestamp",
            Self::Binary => "binary",
        };
        f.write_str(s)
    }
}

/// One attribute value of a feature.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Geometry(Geometry),
    /// Milliseconds since the Unix epoch.
    Timestamp(i64),
    Binary(Vec<u8>),
}

impl Value {
    /// The kind of this value, `None` for `Null`.
    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            Self::Null => None,
            Self::Bool(_) => Some(ValueKind::Bool),
            Self::Int(_) => Some(ValueKind::Int),
            Self::Float(_) => Some(ValueKind::Float),
            Self::Text(_) => Some(ValueKind::Text),
            Self::Geometry(_) => Some(ValueKind::Geometry),
            Self::Timestamp(_) => Some(ValueKind::Timestamp),
            Self::Binary(_) => Some(ValueKind::Binary),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_geometry(&self) -> Option<&Geometry> {
        match self {
            Self::Geometry(g) => Some(g),
            _ => None,
        }
    }

    /// Floating point payloads normalized so that equal numbers encode
    /// identically.
    pub fn canonical(&self) -> Self {
        match self {
            Self::Float(v) => Self::Float(canonical_f64(*v)),
            Self::Geometry(g) => Self::Geometry(g.canonical()),
            other => other.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// RevFeature
// ---------------------------------------------------------------------------

/// A feature: attribute values bound positionally to a feature type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RevFeature {
    pub values: Vec<Value>,
}

impl RevFeature {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Union of the envelopes of every geometry value.
    pub fn envelope(&self) -> Option<Envelope> {
        self.values
            .iter()
            .filter_map(Value::as_geometry)
            .filter_map(Geometry::envelope)
            .reduce(|acc, e| acc.union(&e))
    }

    pub fn canonical(&self) -> Self {
        Self::new(self.values.iter().map(Value::canonical).collect())
    }

    /// Encodes the [`canonical`](Self::canonical) form.
    pub fn to_stored_object(&self) -> StoreResult<StoredObject> {
        encode(ObjectKind::Feature, &self.canonical())
    }

    pub fn from_stored_object(obj: &StoredObject) -> StoreResult<Self> {
        decode(obj, ObjectKind::Feature)
    }
}

// ---------------------------------------------------------------------------
// RevFeatureType
// ---------------------------------------------------------------------------

/// Name, kind and nullability of one attribute.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttributeDescriptor {
    pub name: String,
    pub kind: ValueKind,
    pub nullable: bool,
}

impl AttributeDescriptor {
    pub fn new(name: impl Into<String>, kind: ValueKind, nullable: bool) -> Self {
        Self {
            name: name.into(),
            kind,
            nullable,
        }
    }
}

/// Schema shared by every feature of a typed tree.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RevFeatureType {
    pub name: String,
    pub attributes: Vec<AttributeDescriptor>,
}

impl RevFeatureType {
    pub fn new(name: impl Into<String>, attributes: Vec<AttributeDescriptor>) -> Self {
        Self {
            name: name.into(),
            attributes,
        }
    }

    /// Position of the attribute called `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.attributes.iter().position(|a| a.name == name)
    }

    /// Position of the first geometry attribute, if any.
    pub fn default_geometry(&self) -> Option<usize> {
        self.attributes
            .iter()
            .position(|a| a.kind == ValueKind::Geometry)
    }

    /// Check arity, value kinds and nullability of `feature`.
    pub fn validate(&self, feature: &RevFeature) -> StoreResult<()> {
        let violation = |reason: String| StoreError::SchemaViolation {
            type_name: self.name.clone(),
            reason,
        };
        if feature.values.len() != self.attributes.len() {
            return Err(violation(format!(
                "expected {} values, got {}",
                self.attributes.len(),
                feature.values.len()
            )));
        }
        for (attr, value) in self.attributes.iter().zip(&feature.values) {
            match value.kind() {
                None if !attr.nullable => {
                    return Err(violation(format!("attribute {} is not nullable", attr.name)));
                }
                Some(kind) if kind != attr.kind => {
                    return Err(violation(format!(
                        "attribute {} expects {}, got {}",
                        attr.name, attr.kind, kind
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }

    pub fn to_stored_object(&self) -> StoreResult<StoredObject> {
        encode(ObjectKind::FeatureType, self)
    }

    pub fn from_stored_object(obj: &StoredObject) -> StoreResult<Self> {
        decode(obj, ObjectKind::FeatureType)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn park_type() -> RevFeatureType {
        RevFeatureType::new(
            "parks",
            vec![
                AttributeDescriptor::new("name", ValueKind::Text, false),
                AttributeDescriptor::new("area", ValueKind::Float, true),
                AttributeDescriptor::new("geom", ValueKind::Geometry, false),
            ],
        )
    }

    #[test]
    fn geometry_envelopes() {
        assert_eq!(
            Geometry::point(1.0, 2.0).envelope(),
            Some(Envelope::point(1.0, 2.0))
        );
        let poly = Geometry::Polygon(vec![vec![
            Coord::new(0.0, 0.0),
            Coord::new(4.0, 0.0),
            Coord::new(4.0, 3.0),
            Coord::new(0.0, 0.0),
        ]]);
        assert_eq!(poly.envelope(), Some(Envelope::new(0.0, 0.0, 4.0, 3.0).unwrap()));
        assert_eq!(Geometry::LineString(vec![]).envelope(), None);
    }

    #[test]
    fn feature_envelope_unions_geometries() {
        let f = RevFeature::new(vec![
            Value::Geometry(Geometry::point(0.0, 0.0)),
            Value::Text("x".into()),
            Value::Geometry(Geometry::MultiPoint(vec![Coord::new(5.0, -1.0)])),
        ]);
        assert_eq!(f.envelope(), Some(Envelope::new(0.0, -1.0, 5.0, 0.0).unwrap()));
        assert_eq!(RevFeature::new(vec![Value::Int(1)]).envelope(), None);
    }

    #[test]
    fn validate_accepts_matching_feature() {
        let ft = park_type();
        let f = RevFeature::new(vec![
            Value::Text("Central".into()),
            Value::Null,
            Value::Geometry(Geometry::point(1.0, 1.0)),
        ]);
        ft.validate(&f).unwrap();
        assert_eq!(ft.default_geometry(), Some(2));
        assert_eq!(ft.index_of("area"), Some(1));
    }

    #[test]
    fn validate_rejects_bad_features() {
        let ft = park_type();
        let wrong_arity = RevFeature::new(vec![Value::Text("a".into())]);
        let null_name = RevFeature::new(vec![
            Value::Null,
            Value::Float(1.0),
            Value::Geometry(Geometry::point(0.0, 0.0)),
        ]);
        let wrong_kind = RevFeature::new(vec![
            Value::Text("a".into()),
            Value::Int(3),
            Value::Geometry(Geometry::point(0.0, 0.0)),
        ]);
        for f in [wrong_arity, null_name, wrong_kind] {
            assert!(matches!(
                ft.validate(&f),
                Err(StoreError::SchemaViolation { .. })
            ));
        }
    }

    #[test]
    fn signed_zero_and_nan_payloads_share_an_id() {
        let id = |v: f64| {
            RevFeature::new(vec![Value::Float(v), Value::Geometry(Geometry::point(v, 1.0))])
                .to_stored_object()
                .unwrap()
                .compute_id()
        };
        assert_eq!(id(0.0), id(-0.0));
        assert_eq!(id(f64::NAN), id(f64::from_bits(0x7ff8_0000_0000_0001)));
        assert_eq!(id(f64::NAN), id(-f64::NAN));
        assert_ne!(id(0.0), id(f64::MIN_POSITIVE));

        let ring = |z: f64| {
            RevFeature::new(vec![Value::Geometry(Geometry::Polygon(vec![vec![
                Coord::new(z, z),
                Coord::new(1.0, z),
                Coord::new(z, z),
            ]]))])
        };
        assert_eq!(
            ring(-0.0).to_stored_object().unwrap(),
            ring(0.0).to_stored_object().unwrap()
        );
    }

    #[test]
    fn decoded_feature_is_canonical() {
        let stored = RevFeature::new(vec![Value::Float(-0.0)]).to_stored_object().unwrap();
        let Value::Float(v) = RevFeature::from_stored_object(&stored).unwrap().values[0] else {
            panic!("expected a float");
        };
        assert!(v.is_sign_positive());
    }

    #[test]
    fn feature_type_roundtrip() {
        let ft = park_type();
        let stored = ft.to_stored_object().unwrap();
        assert_eq!(RevFeatureType::from_stored_object(&stored).unwrap(), ft);
    }
}
