use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use gvc_types::ObjectId;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::object::{ObjectKind, StoredObject};
use crate::traits::ObjectStore;

/// Loose-object store on the local filesystem.
///
/// Each object lives at `<root>/objects/ab/cdef...` (first hex byte as the
/// fan-out directory) and holds one kind byte followed by the canonical
/// payload. Writes go to a temp file in the fan-out directory which is then
/// persisted into place, so readers never observe a partial object.
#[derive(Debug, Clone)]
pub struct FileObjectStore {
    objects_dir: PathBuf,
}

impl FileObjectStore {
    /// Open (creating if needed) the object directory under `root`.
    pub fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let objects_dir = root.as_ref().join("objects");
        fs::create_dir_all(&objects_dir)?;
        Ok(Self { objects_dir })
    }

    pub fn objects_dir(&self) -> &Path {
        &self.objects_dir
    }

    /// Path an object with this id is stored at.
    pub fn object_path(&self, id: &ObjectId) -> PathBuf {
        let hex = id.to_hex();
        self.objects_dir.join(&hex[..2]).join(&hex[2..])
    }
}

impl ObjectStore for FileObjectStore {
    fn read(&self, id: &ObjectId) -> StoreResult<Option<StoredObject>> {
        let bytes = match fs::read(self.object_path(id)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let (&tag, payload) = bytes.split_first().ok_or_else(|| StoreError::CorruptObject {
            id: *id,
            reason: "empty object file".into(),
        })?;
        let kind = ObjectKind::from_byte(tag).ok_or_else(|| StoreError::CorruptObject {
            id: *id,
            reason: format!("unknown kind byte {tag:#04x}"),
        })?;
        let stored = StoredObject::new(kind, payload.to_vec());
        let computed = stored.compute_id();
        if computed != *id {
            return Err(StoreError::HashMismatch { id: *id, computed });
        }
        Ok(Some(stored))
    }

    fn write(&self, object: &StoredObject) -> StoreResult<ObjectId> {
        let id = object.compute_id();
        if id.is_null() {
            return Err(StoreError::NullObjectId);
        }
        let path = self.object_path(&id);
        if path.exists() {
            return Ok(id);
        }
        let dir = path.parent().unwrap_or(&self.objects_dir);
        fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&[object.kind.as_byte()])?;
        tmp.write_all(&object.data)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| StoreError::Io(e.error))?;
        debug!(id = %id.short_hex(), path = %path.display(), "loose object persisted");
        Ok(id)
    }

    fn exists(&self, id: &ObjectId) -> StoreResult<bool> {
        Ok(self.object_path(id).is_file())
    }

    fn delete(&self, id: &ObjectId) -> StoreResult<bool> {
        match fs::remove_file(self.object_path(id)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{Geometry, RevFeature, Value};
    use crate::traits::ObjectStoreExt;
    use crate::tree::RevTree;

    fn feature() -> RevFeature {
        RevFeature::new(vec![
            Value::Text("Stanley Park".into()),
            Value::Geometry(Geometry::point(-123.14, 49.30)),
        ])
    }

    #[test]
    fn write_read_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileObjectStore::open(dir.path()).unwrap();
        let id = store.put_feature(&feature()).unwrap();

        let hex = id.to_hex();
        let expected = dir.path().join("objects").join(&hex[..2]).join(&hex[2..]);
        assert!(expected.is_file());
        assert_eq!(store.get_feature(&id).unwrap(), feature());
    }

    #[test]
    fn write_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileObjectStore::open(dir.path()).unwrap();
        let a = store.put_tree(&RevTree::empty()).unwrap();
        let b = store.put_tree(&RevTree::empty()).unwrap();
        assert_eq!(a, b);
        let fanout = store.object_path(&a);
        let siblings = fs::read_dir(fanout.parent().unwrap()).unwrap().count();
        assert_eq!(siblings, 1);
    }

    #[test]
    fn reopened_store_sees_objects() {
        let dir = tempfile::tempdir().unwrap();
        let id = FileObjectStore::open(dir.path())
            .unwrap()
            .put_feature(&feature())
            .unwrap();
        let reopened = FileObjectStore::open(dir.path()).unwrap();
        assert!(reopened.exists(&id).unwrap());
    }

    #[test]
    fn corrupted_file_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileObjectStore::open(dir.path()).unwrap();
        let id = store.put_feature(&feature()).unwrap();

        let path = store.object_path(&id);
        let mut bytes = fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        fs::write(&path, bytes).unwrap();

        assert!(matches!(
            store.read(&id),
            Err(StoreError::HashMismatch { .. })
        ));
    }

    #[test]
    fn unknown_kind_byte_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileObjectStore::open(dir.path()).unwrap();
        let id = store.put_feature(&feature()).unwrap();
        let path = store.object_path(&id);
        let mut bytes = fs::read(&path).unwrap();
        bytes[0] = 0xee;
        fs::write(&path, bytes).unwrap();
        assert!(matches!(
            store.read(&id),
            Err(StoreError::CorruptObject { .. })
        ));
    }

    #[test]
    fn delete_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileObjectStore::open(dir.path()).unwrap();
        let id = store.put_feature(&feature()).unwrap();
        assert!(store.delete(&id).unwrap());
        assert!(!store.delete(&id).unwrap());
        assert!(store.read(&id).unwrap().is_none());
    }
}
