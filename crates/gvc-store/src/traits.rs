use gvc_types::ObjectId;
use tracing::debug;

use crate::commit::{RevCommit, RevTag};
use crate::error::{StoreError, StoreResult};
use crate::feature::{RevFeature, RevFeatureType};
use crate::object::{RevBlob, RevObject, StoredObject};
use crate::tree::RevTree;

/// Content-addressed object store.
///
/// All implementations must satisfy these invariants:
/// - Objects are immutable once written; the same data always produces the
///   same ID.
/// - Write-then-link: write the object, verify the hash, then return the ID.
/// - Concurrent reads are always safe.
/// - The store never interprets object contents.
/// - All I/O errors are propagated, never silently ignored.
pub trait ObjectStore: Send + Sync {
    /// Read an object by its content-addressed ID.
    ///
    /// Returns `Ok(None)` if the object does not exist.
    fn read(&self, id: &ObjectId) -> StoreResult<Option<StoredObject>>;

    /// Write an object and return its content-addressed ID.
    ///
    /// If the object already exists, this is a no-op (idempotent).
    fn write(&self, object: &StoredObject) -> StoreResult<ObjectId>;

    fn exists(&self, id: &ObjectId) -> StoreResult<bool>;

    /// Delete an object by ID. Returns `true` if the object existed.
    ///
    /// Intended for garbage collection only.
    fn delete(&self, id: &ObjectId) -> StoreResult<bool>;

    fn read_batch(&self, ids: &[ObjectId]) -> StoreResult<Vec<Option<StoredObject>>> {
        ids.iter().map(|id| self.read(id)).collect()
    }

    fn write_batch(&self, objects: &[StoredObject]) -> StoreResult<Vec<ObjectId>> {
        objects.iter().map(|obj| self.write(obj)).collect()
    }
}

/// Typed access to revision objects, available on every [`ObjectStore`].
///
/// Every read rehashes the stored payload: content that does not reproduce
/// the requested id fails with [`StoreError::HashMismatch`].
pub trait ObjectStoreExt: ObjectStore {
    fn put(&self, object: &RevObject) -> StoreResult<ObjectId> {
        self.put_stored(&object.to_stored_object()?)
    }

    fn put_tree(&self, tree: &RevTree) -> StoreResult<ObjectId> {
        self.put_stored(&tree.to_stored_object()?)
    }

    fn put_feature(&self, feature: &RevFeature) -> StoreResult<ObjectId> {
        self.put_stored(&feature.to_stored_object()?)
    }

    fn put_feature_type(&self, feature_type: &RevFeatureType) -> StoreResult<ObjectId> {
        self.put_stored(&feature_type.to_stored_object()?)
    }

    fn put_commit(&self, commit: &RevCommit) -> StoreResult<ObjectId> {
        self.put_stored(&commit.to_stored_object()?)
    }

    fn put_tag(&self, tag: &RevTag) -> StoreResult<ObjectId> {
        self.put_stored(&tag.to_stored_object()?)
    }

    fn put_blob(&self, blob: &RevBlob) -> StoreResult<ObjectId> {
        self.put_stored(&blob.to_stored_object()?)
    }

    #[doc(hidden)]
    fn put_stored(&self, stored: &StoredObject) -> StoreResult<ObjectId> {
        let id = self.write(stored)?;
        debug!(id = %id.short_hex(), kind = %stored.kind, size = stored.size, "object written");
        Ok(id)
    }

    /// Read and verify the raw object, failing with `NotFound` if absent.
    fn get_verified(&self, id: &ObjectId) -> StoreResult<StoredObject> {
        let stored = self.read(id)?.ok_or(StoreError::NotFound(*id))?;
        let computed = stored.compute_id();
        if computed != *id {
            return Err(StoreError::HashMismatch { id: *id, computed });
        }
        Ok(stored)
    }

    fn get(&self, id: &ObjectId) -> StoreResult<RevObject> {
        RevObject::from_stored_object(&self.get_verified(id)?)
    }

    fn get_if_exists(&self, id: &ObjectId) -> StoreResult<Option<RevObject>> {
        match self.get(id) {
            Ok(obj) => Ok(Some(obj)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Read a tree. The well-known empty tree resolves even if never written.
    fn get_tree(&self, id: &ObjectId) -> StoreResult<RevTree> {
        match self.get_verified(id) {
            Ok(stored) => RevTree::from_stored_object(&stored),
            Err(StoreError::NotFound(_)) if *id == RevTree::empty_id() => Ok(RevTree::empty()),
            Err(e) => Err(e),
        }
    }

    fn get_feature(&self, id: &ObjectId) -> StoreResult<RevFeature> {
        RevFeature::from_stored_object(&self.get_verified(id)?)
    }

    fn get_feature_type(&self, id: &ObjectId) -> StoreResult<RevFeatureType> {
        RevFeatureType::from_stored_object(&self.get_verified(id)?)
    }

    fn get_commit(&self, id: &ObjectId) -> StoreResult<RevCommit> {
        RevCommit::from_stored_object(&self.get_verified(id)?)
    }

    fn get_tag(&self, id: &ObjectId) -> StoreResult<RevTag> {
        RevTag::from_stored_object(&self.get_verified(id)?)
    }

    fn get_blob(&self, id: &ObjectId) -> StoreResult<RevBlob> {
        RevBlob::from_stored_object(&self.get_verified(id)?)
    }
}

impl<S: ObjectStore + ?Sized> ObjectStoreExt for S {}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;
    use crate::feature::Value;
    use crate::memory::InMemoryObjectStore;
    use crate::object::ObjectKind;
    use gvc_types::Person;
    use proptest::prelude::*;

    /// Store that returns whatever bytes were planted under an id.
    #[derive(Default)]
    struct PlantedStore {
        objects: Mutex<HashMap<ObjectId, StoredObject>>,
    }

    impl PlantedStore {
        fn plant(&self, id: ObjectId, obj: StoredObject) {
            self.objects.lock().unwrap().insert(id, obj);
        }
    }

    impl ObjectStore for PlantedStore {
        fn read(&self, id: &ObjectId) -> StoreResult<Option<StoredObject>> {
            Ok(self.objects.lock().unwrap().get(id).cloned())
        }
        fn write(&self, object: &StoredObject) -> StoreResult<ObjectId> {
            let id = object.compute_id();
            self.plant(id, object.clone());
            Ok(id)
        }
        fn exists(&self, id: &ObjectId) -> StoreResult<bool> {
            Ok(self.objects.lock().unwrap().contains_key(id))
        }
        fn delete(&self, id: &ObjectId) -> StoreResult<bool> {
            Ok(self.objects.lock().unwrap().remove(id).is_some())
        }
    }

    fn commit() -> RevCommit {
        let p = Person::new("a", "a@b", 0, 0);
        RevCommit::new(RevTree::empty_id(), vec![], p.clone(), p, "initial")
    }

    #[test]
    fn put_get_roundtrip_reproduces_id() {
        let store = InMemoryObjectStore::new();
        let obj = RevObject::Commit(commit());
        let id = store.put(&obj).unwrap();
        let fetched = store.get(&id).unwrap();
        assert_eq!(fetched, obj);
        assert_eq!(store.put(&fetched).unwrap(), id);
    }

    #[test]
    fn missing_object_is_not_found() {
        let store = InMemoryObjectStore::new();
        let id = ObjectId::from_bytes(b"nope");
        assert!(matches!(store.get(&id), Err(StoreError::NotFound(_))));
        assert!(store.get_if_exists(&id).unwrap().is_none());
    }

    #[test]
    fn corrupted_content_is_detected() {
        let store = PlantedStore::default();
        let id = store.put_commit(&commit()).unwrap();
        let tampered = RevFeature::new(vec![Value::Int(7)]).to_stored_object().unwrap();
        store.plant(id, tampered);
        assert!(matches!(
            store.get(&id),
            Err(StoreError::HashMismatch { .. })
        ));
        assert!(matches!(
            store.get_commit(&id),
            Err(StoreError::HashMismatch { .. })
        ));
    }

    #[test]
    fn typed_getter_rejects_wrong_kind() {
        let store = InMemoryObjectStore::new();
        let id = store.put_commit(&commit()).unwrap();
        let err = store.get_tree(&id).unwrap_err();
        assert!(matches!(
            err,
            StoreError::UnexpectedKind {
                expected: ObjectKind::Tree,
                actual: ObjectKind::Commit,
                ..
            }
        ));
    }

    #[test]
    fn empty_tree_is_always_readable() {
        let store = InMemoryObjectStore::new();
        assert!(store.get_tree(&RevTree::empty_id()).unwrap().is_empty());
        assert_eq!(store.put_tree(&RevTree::empty()).unwrap(), RevTree::empty_id());
    }

    #[test]
    fn works_through_trait_object() {
        let store: std::sync::Arc<dyn ObjectStore> = std::sync::Arc::new(InMemoryObjectStore::new());
        let id = store.put_feature(&RevFeature::new(vec![Value::Bool(true)])).unwrap();
        assert!(store.exists(&id).unwrap());
        assert_eq!(store.get_feature(&id).unwrap().values, vec![Value::Bool(true)]);
    }

    #[test]
    fn blob_roundtrip() {
        let store = InMemoryObjectStore::new();
        let id = store.put_blob(&RevBlob::new(&b"conflicts"[..])).unwrap();
        assert_eq!(store.get_blob(&id).unwrap().data, b"conflicts");
        assert!(store.get_feature(&id).is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn verified_reads_reproduce_the_written_id(
            ints in proptest::collection::vec(any::<i64>(), 0..8),
            text in "[a-z]{0,16}",
        ) {
            let store = InMemoryObjectStore::new();
            let mut values: Vec<Value> = ints.into_iter().map(Value::Int).collect();
            values.push(Value::Text(text));
            let feature = RevFeature::new(values);
            let id = store.put_feature(&feature).unwrap();
            prop_assert_eq!(store.get_verified(&id).unwrap().compute_id(), id);
            prop_assert_eq!(store.put_feature(&store.get_feature(&id).unwrap()).unwrap(), id);
        }

        #[test]
        fn any_flipped_byte_is_a_hash_mismatch(
            data in proptest::collection::vec(any::<u8>(), 1..64),
            at in any::<prop::sample::Index>(),
        ) {
            let store = PlantedStore::default();
            let id = store.put_blob(&RevBlob::new(data.clone())).unwrap();
            let mut tampered = data;
            let i = at.index(tampered.len());
            tampered[i] ^= 0x01;
            store.plant(id, StoredObject::new(ObjectKind::Blob, tampered));
            let mismatch = matches!(store.get_blob(&id), Err(StoreError::HashMismatch { .. }));
            prop_assert!(mismatch);
        }
    }
}
