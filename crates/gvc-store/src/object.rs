use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use gvc_types::ObjectId;

use crate::commit::{RevCommit, RevTag};
use crate::error::{StoreError, StoreResult};
use crate::feature::{RevFeature, RevFeatureType};
use crate::hasher::ContentHasher;
use crate::tree::RevTree;

/// The kind of object stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    Tree,
    Feature,
    FeatureType,
    Commit,
    Tag,
    /// Opaque bytes the store never interprets.
    Blob,
}

impl ObjectKind {
    /// Single-byte tag used by on-disk backends.
    pub fn as_byte(self) -> u8 {
        match self {
            Self::Tree => 1,
            Self::Feature => 2,
            Self::FeatureType => 3,
            Self::Commit => 4,
            Self::Tag => 5,
            Self::Blob => 6,
        }
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(Self::Tree),
            2 => Some(Self::Feature),
            3 => Some(Self::FeatureType),
            4 => Some(Self::Commit),
            5 => Some(Self::Tag),
            6 => Some(Self::Blob),
            _ => None,
        }
    }

    /// The domain-separated hasher for this kind.
    pub fn hasher(self) -> ContentHasher {
        match self {
            Self::Tree => ContentHasher::TREE,
            Self::Feature => ContentHasher::FEATURE,
            Self::FeatureType => ContentHasher::FEATURE_TYPE,
            Self::Commit => ContentHasher::COMMIT,
            Self::Tag => ContentHasher::TAG,
            Self::Blob => ContentHasher::BLOB,
        }
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tree => write!(f, "tree"),
            Self::Feature => write!(f, "feature"),
            Self::FeatureType => write!(f, "featuretype"),
            Self::Commit => write!(f, "commit"),
            Self::Tag => write!(f, "tag"),
            Self::Blob => write!(f, "blob"),
        }
    }
}

/// A stored object: kind tag + canonical encoding + cached size.
///
/// `StoredObject` is the unit of storage. Backends never interpret `data`;
/// they only key it by the id computed from `kind` and `data`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredObject {
    pub kind: ObjectKind,
    pub data: Vec<u8>,
    pub size: u64,
}

impl StoredObject {
    pub fn new(kind: ObjectKind, data: Vec<u8>) -> Self {
        let size = data.len() as u64;
        Self { kind, data, size }
    }

    /// Compute the content-addressed ID for this object.
    pub fn compute_id(&self) -> ObjectId {
        self.kind.hasher().hash(&self.data)
    }
}

/// Encode `value` canonically as an object of `kind`.
pub(crate) fn encode<T: Serialize>(kind: ObjectKind, value: &T) -> StoreResult<StoredObject> {
    Ok(StoredObject::new(kind, bincode::serialize(value)?))
}

/// Decode an object of the `expected` kind.
pub(crate) fn decode<T: DeserializeOwned>(
    obj: &StoredObject,
    expected: ObjectKind,
) -> StoreResult<T> {
    if obj.kind != expected {
        return Err(StoreError::UnexpectedKind {
            id: obj.compute_id(),
            expected,
            actual: obj.kind,
        });
    }
    bincode::deserialize(&obj.data).map_err(|e| StoreError::CorruptObject {
        id: obj.compute_id(),
        reason: e.to_string(),
    })
}

// ---------------------------------------------------------------------------
// RevBlob
// ---------------------------------------------------------------------------

/// Raw content stored verbatim, without the canonical encoding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevBlob {
    pub data: Vec<u8>,
}

impl RevBlob {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self { data: data.into() }
    }

    pub fn to_stored_object(&self) -> StoreResult<StoredObject> {
        Ok(StoredObject::new(ObjectKind::Blob, self.data.clone()))
    }

    pub fn from_stored_object(obj: &StoredObject) -> StoreResult<Self> {
        if obj.kind != ObjectKind::Blob {
            return Err(StoreError::UnexpectedKind {
                id: obj.compute_id(),
                expected: ObjectKind::Blob,
                actual: obj.kind,
            });
        }
        Ok(Self::new(obj.data.clone()))
    }
}

/// Any immutable revision object.
#[derive(Clone, Debug, PartialEq)]
pub enum RevObject {
    Tree(RevTree),
    Feature(RevFeature),
    FeatureType(RevFeatureType),
    Commit(RevCommit),
    Tag(RevTag),
    Blob(RevBlob),
}

impl RevObject {
    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::Tree(_) => ObjectKind::Tree,
            Self::Feature(_) => ObjectKind::Feature,
            Self::FeatureType(_) => ObjectKind::FeatureType,
            Self::Commit(_) => ObjectKind::Commit,
            Self::Tag(_) => ObjectKind::Tag,
            Self::Blob(_) => ObjectKind::Blob,
        }
    }

    pub fn to_stored_object(&self) -> StoreResult<StoredObject> {
        match self {
            Self::Tree(t) => t.to_stored_object(),
            Self::Feature(f) => f.to_stored_object(),
            Self::FeatureType(ft) => ft.to_stored_object(),
            Self::Commit(c) => c.to_stored_object(),
            Self::Tag(t) => t.to_stored_object(),
            Self::Blob(b) => b.to_stored_object(),
        }
    }

    pub fn from_stored_object(obj: &StoredObject) -> StoreResult<Self> {
        Ok(match obj.kind {
            ObjectKind::Tree => Self::Tree(RevTree::from_stored_object(obj)?),
            ObjectKind::Feature => Self::Feature(RevFeature::from_stored_object(obj)?),
            ObjectKind::FeatureType => {
                Self::FeatureType(RevFeatureType::from_stored_object(obj)?)
            }
            ObjectKind::Commit => Self::Commit(RevCommit::from_stored_object(obj)?),
            ObjectKind::Tag => Self::Tag(RevTag::from_stored_object(obj)?),
            ObjectKind::Blob => Self::Blob(RevBlob::from_stored_object(obj)?),
        })
    }

    /// The id this object would be stored under.
    pub fn id(&self) -> StoreResult<ObjectId> {
        Ok(self.to_stored_object()?.compute_id())
    }
}

impl From<RevTree> for RevObject {
    fn from(t: RevTree) -> Self {
        Self::Tree(t)
    }
}

impl From<RevFeature> for RevObject {
    fn from(f: RevFeature) -> Self {
        Self::Feature(f)
    }
}

impl From<RevFeatureType> for RevObject {
    fn from(ft: RevFeatureType) -> Self {
        Self::FeatureType(ft)
    }
}

impl From<RevCommit> for RevObject {
    fn from(c: RevCommit) -> Self {
        Self::Commit(c)
    }
}

impl From<RevTag> for RevObject {
    fn from(t: RevTag) -> Self {
        Self::Tag(t)
    }
}

impl From<RevBlob> for RevObject {
    fn from(b: RevBlob) -> Self {
        Self::Blob(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{Coord, Geometry, Value};
    use proptest::prelude::*;

    #[test]
    fn kind_byte_roundtrip() {
        for kind in [
            ObjectKind::Tree,
            ObjectKind::Feature,
            ObjectKind::FeatureType,
            ObjectKind::Commit,
            ObjectKind::Tag,
            ObjectKind::Blob,
        ] {
            assert_eq!(ObjectKind::from_byte(kind.as_byte()), Some(kind));
        }
        assert_eq!(ObjectKind::from_byte(0), None);
        assert_eq!(ObjectKind::from_byte(42), None);
    }

    #[test]
    fn kind_mismatch_is_rejected() {
        let stored = RevFeature::new(vec![Value::Int(1)]).to_stored_object().unwrap();
        let err = RevTree::from_stored_object(&stored).unwrap_err();
        assert!(matches!(
            err,
            StoreError::UnexpectedKind {
                expected: ObjectKind::Tree,
                actual: ObjectKind::Feature,
                ..
            }
        ));
    }

    #[test]
    fn garbage_payload_is_corrupt() {
        let stored = StoredObject::new(ObjectKind::Commit, vec![0xff; 3]);
        let err = RevObject::from_stored_object(&stored).unwrap_err();
        assert!(matches!(err, StoreError::CorruptObject { .. }));
    }

    #[test]
    fn rev_object_dispatch_roundtrip() {
        let obj = RevObject::from(RevFeature::new(vec![
            Value::Text("oak".into()),
            Value::Float(12.5),
        ]));
        assert_eq!(obj.kind(), ObjectKind::Feature);
        let stored = obj.to_stored_object().unwrap();
        assert_eq!(stored.size, stored.data.len() as u64);
        assert_eq!(RevObject::from_stored_object(&stored).unwrap(), obj);
        assert_eq!(obj.id().unwrap(), stored.compute_id());
    }

    #[test]
    fn blob_is_stored_verbatim() {
        let blob = RevBlob::new(&b"[]"[..]);
        let stored = blob.to_stored_object().unwrap();
        assert_eq!(stored.kind, ObjectKind::Blob);
        assert_eq!(stored.data, b"[]");
        assert_eq!(RevObject::from_stored_object(&stored).unwrap(), RevObject::Blob(blob));
        assert!(matches!(
            RevCommit::from_stored_object(&stored),
            Err(StoreError::UnexpectedKind { actual: ObjectKind::Blob, .. })
        ));
    }

    fn value() -> impl Strategy<Value = Value> {
        let coord = (-1e6..1e6f64, -1e6..1e6f64).prop_map(|(x, y)| Coord::new(x, y));
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::Int),
            prop_oneof![Just(-0.0), -1e9..1e9f64].prop_map(Value::Float),
            "[a-z ]{0,12}".prop_map(Value::Text),
            coord.clone().prop_map(|c| Value::Geometry(Geometry::Point(c))),
            proptest::collection::vec(coord, 0..6)
                .prop_map(|cs| Value::Geometry(Geometry::LineString(cs))),
            any::<i64>().prop_map(Value::Timestamp),
            proptest::collection::vec(any::<u8>(), 0..16).prop_map(Value::Binary),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn feature_decode_inverts_encode(values in proptest::collection::vec(value(), 0..8)) {
            let feature = RevFeature::new(values);
            let stored = feature.to_stored_object().unwrap();
            let decoded = RevFeature::from_stored_object(&stored).unwrap();
            prop_assert_eq!(&decoded, &feature.canonical());
            prop_assert_eq!(decoded.to_stored_object().unwrap(), stored);
        }
    }
}
