//! The working tree: the editable root tree at `WORK_HEAD`.

use gvc_diff::{DiffEntry, DiffTree};
use gvc_refs::{names, RefStore};
use gvc_store::{Node, ObjectStore, ObjectStoreExt, RevFeature, RevFeatureType, RevTree};
use gvc_tree::{path, NodeRef, TreeConfig};
use gvc_types::ObjectId;
use tracing::debug;

use crate::error::{IndexError, IndexResult};
use crate::tree_ref::TreeRef;

/// Feature edits land here before they are staged.
///
/// Every edit writes new tree objects and moves `WORK_HEAD` by
/// compare-and-swap, so a concurrent edit through another handle fails
/// instead of being lost.
#[derive(Clone, Copy)]
pub struct WorkingTree<'a> {
    tree: TreeRef<'a>,
}

impl<'a> WorkingTree<'a> {
    pub fn new(store: &'a dyn ObjectStore, refs: &'a dyn RefStore, config: TreeConfig) -> Self {
        Self {
            tree: TreeRef {
                store,
                refs,
                config,
                name: names::WORK_HEAD,
            },
        }
    }

    pub fn store(&self) -> &'a dyn ObjectStore {
        self.tree.store
    }

    pub fn config(&self) -> TreeConfig {
        self.tree.config
    }

    /// Id of the working tree root.
    pub fn tree_id(&self) -> IndexResult<ObjectId> {
        self.tree.id()
    }

    pub fn tree(&self) -> IndexResult<RevTree> {
        self.tree.tree()
    }

    /// Replace the whole working tree.
    pub fn update_work_head(&self, tree_id: ObjectId) -> IndexResult<()> {
        self.tree.set(tree_id)
    }

    /// Node at `path`, if any.
    pub fn get(&self, path: &str) -> IndexResult<Option<NodeRef>> {
        Ok(self.tree.editor().lookup(&self.tree_id()?, path)?)
    }

    /// Feature stored at `path` together with its node.
    pub fn feature(&self, path: &str) -> IndexResult<Option<(NodeRef, RevFeature)>> {
        match self.get(path)? {
            Some(node) if node.is_tree() => Err(IndexError::NotAFeature(path.to_string())),
            Some(node) => {
                let feature = self.store().get_feature(&node.object_id())?;
                Ok(Some((node, feature)))
            }
            None => Ok(None),
        }
    }

    /// Insert or replace one feature under `parent_path`.
    ///
    /// The feature is validated against `feature_type`. A missing parent is
    /// created as a tree typed by `feature_type`.
    pub fn insert(
        &self,
        parent_path: &str,
        name: &str,
        feature: &RevFeature,
        feature_type: &RevFeatureType,
    ) -> IndexResult<NodeRef> {
        let mut inserted =
            self.insert_many(parent_path, feature_type, [(name.to_string(), feature.clone())])?;
        inserted
            .pop()
            .ok_or_else(|| IndexError::PathNotFound(path::join(parent_path, name)))
    }

    /// Insert several features of one type under `parent_path` in a single
    /// working-tree update.
    pub fn insert_many<I>(
        &self,
        parent_path: &str,
        feature_type: &RevFeatureType,
        features: I,
    ) -> IndexResult<Vec<NodeRef>>
    where
        I: IntoIterator<Item = (String, RevFeature)>,
    {
        let store = self.store();
        let type_id = store.put_feature_type(feature_type)?;
        let mut nodes = Vec::new();
        for (name, feature) in features {
            feature_type.validate(&feature)?;
            let id = store.put_feature(&feature)?;
            nodes.push(Node::feature(name, id, Some(type_id), feature.envelope()));
        }

        self.tree.edit(|editor, root| {
            let mut root = root;
            if !parent_path.is_empty() && editor.lookup(&root, parent_path)?.is_none() {
                let typed = Node::tree("", RevTree::empty_id(), Some(type_id));
                root = editor.update(&root, parent_path, Some(typed))?;
            }
            for node in &nodes {
                root = editor.update(&root, &path::join(parent_path, &node.name), Some(node.clone()))?;
            }
            Ok(root)
        })?;
        debug!(parent = parent_path, count = nodes.len(), "features inserted");
        Ok(nodes
            .into_iter()
            .map(|node| NodeRef::new(parent_path, node))
            .collect())
    }

    /// Place an arbitrary node at `parent_path/node.name`.
    pub fn insert_node(&self, parent_path: &str, node: Node) -> IndexResult<NodeRef> {
        let p = path::join(parent_path, &node.name);
        self.tree
            .edit(|editor, root| Ok(editor.update(&root, &p, Some(node.clone()))?))?;
        Ok(NodeRef::new(parent_path, node))
    }

    /// Replace an existing feature.
    pub fn update(
        &self,
        path: &str,
        feature: &RevFeature,
        feature_type: &RevFeatureType,
    ) -> IndexResult<NodeRef> {
        match self.get(path)? {
            None => Err(IndexError::PathNotFound(path.to_string())),
            Some(node) if node.is_tree() => Err(IndexError::NotAFeature(path.to_string())),
            Some(node) => self.insert(&node.parent_path, node.name(), feature, feature_type),
        }
    }

    /// Remove the node at `path` and everything below it. Returns `false`
    /// if nothing was there.
    pub fn delete(&self, path: &str) -> IndexResult<bool> {
        let mut found = false;
        self.tree.edit(|editor, root| {
            if editor.lookup(&root, path)?.is_none() {
                return Ok(root);
            }
            found = true;
            Ok(editor.update(&root, path, None)?)
        })?;
        if found {
            debug!(path, "node deleted");
        }
        Ok(found)
    }

    /// Create an empty tree at `path` whose default feature type is
    /// `feature_type`.
    pub fn create_type_tree(&self, path: &str, feature_type: &RevFeatureType) -> IndexResult<NodeRef> {
        let type_id = self.store().put_feature_type(feature_type)?;
        let (parent, name) = path::split_parent(path);
        let node = Node::tree(name, RevTree::empty_id(), Some(type_id));
        self.tree.edit(|editor, root| {
            if editor.lookup(&root, path)?.is_some() {
                return Err(IndexError::AlreadyExists(path.to_string()));
            }
            Ok(editor.update(&root, path, Some(node.clone()))?)
        })?;
        Ok(NodeRef::new(parent, node))
    }

    /// Every tree that carries a default feature type.
    pub fn find_feature_type_trees(&self) -> IndexResult<Vec<NodeRef>> {
        Ok(self
            .tree
            .editor()
            .walk(&self.tree_id()?, true)?
            .into_iter()
            .filter(|n| n.is_tree() && n.metadata_id().is_some())
            .collect())
    }

    /// Changes in the working tree that are not staged, limited to `paths`
    /// (all when empty).
    pub fn unstaged(&self, paths: &[&str]) -> IndexResult<Vec<DiffEntry>> {
        let stage = self.tree.refs.resolve(names::STAGE_HEAD)?;
        let stage = stage.unwrap_or_else(RevTree::empty_id);
        Ok(DiffTree::new(self.store(), stage, self.tree_id()?)
            .filter(paths)
            .collect_entries()?)
    }

    pub fn count_unstaged(&self, paths: &[&str]) -> IndexResult<usize> {
        Ok(self.unstaged(paths)?.len())
    }

    pub fn has_unstaged(&self) -> IndexResult<bool> {
        let stage = self.tree.refs.resolve(names::STAGE_HEAD)?;
        Ok(stage.unwrap_or_else(RevTree::empty_id) != self.tree_id()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;
    use gvc_refs::{InMemoryRefStore, RefError};
    use gvc_store::{InMemoryObjectStore, StoreError, Value};

    // ---- inserts ----

    #[test]
    fn insert_creates_typed_parent() {
        let store = InMemoryObjectStore::new();
        let refs = InMemoryRefStore::new();
        let work = WorkingTree::new(&store, &refs, TreeConfig::default());
        assert_eq!(work.tree_id().unwrap(), RevTree::empty_id());

        let node = work.insert("parks", "1", &park("one", 1.0, 2.0), &park_type()).unwrap();
        assert_eq!(node.path(), "parks/1");
        assert!(node.node.envelope.is_some());

        let parks = work.get("parks").unwrap().unwrap();
        assert!(parks.is_tree());
        let type_id = store.put_feature_type(&park_type()).unwrap();
        assert_eq!(parks.metadata_id(), Some(type_id));
        let (found, feature) = work.feature("parks/1").unwrap().unwrap();
        assert_eq!(found.object_id(), node.object_id());
        assert_eq!(feature, park("one", 1.0, 2.0));
        assert_eq!(work.tree().unwrap().size, 1);
    }

    #[test]
    fn insert_rejects_schema_violation() {
        let store = InMemoryObjectStore::new();
        let refs = InMemoryRefStore::new();
        let work = WorkingTree::new(&store, &refs, TreeConfig::default());
        let bad = RevFeature::new(vec![Value::Int(3)]);
        let err = work.insert("parks", "1", &bad, &park_type()).unwrap_err();
        assert!(matches!(err, IndexError::Store(StoreError::SchemaViolation { .. })));
        assert_eq!(work.tree_id().unwrap(), RevTree::empty_id());
    }

    #[test]
    fn insert_many_moves_ref_once() {
        let store = InMemoryObjectStore::new();
        let refs = InMemoryRefStore::new();
        let work = WorkingTree::new(&store, &refs, TreeConfig::default());
        let nodes = work
            .insert_many("parks", &park_type(), five_parks())
            .unwrap();
        assert_eq!(nodes.len(), 5);
        assert_eq!(work.tree().unwrap().size, 5);
    }

    #[test]
    fn update_requires_existing_feature() {
        let store = InMemoryObjectStore::new();
        let refs = InMemoryRefStore::new();
        let work = WorkingTree::new(&store, &refs, TreeConfig::default());
        assert!(matches!(
            work.update("parks/1", &park("x", 0.0, 0.0), &park_type()),
            Err(IndexError::PathNotFound(_))
        ));
        work.insert("parks", "1", &park("x", 0.0, 0.0), &park_type()).unwrap();
        let before = work.tree_id().unwrap();
        work.update("parks/1", &park("y", 0.0, 0.0), &park_type()).unwrap();
        assert_ne!(work.tree_id().unwrap(), before);
        assert!(matches!(
            work.update("parks", &park("y", 0.0, 0.0), &park_type()),
            Err(IndexError::NotAFeature(_))
        ));
    }

    #[test]
    fn delete_reports_presence() {
        let store = InMemoryObjectStore::new();
        let refs = InMemoryRefStore::new();
        let work = WorkingTree::new(&store, &refs, TreeConfig::default());
        work.insert_many("parks", &park_type(), five_parks()).unwrap();
        assert!(work.delete("parks/3").unwrap());
        assert!(!work.delete("parks/3").unwrap());
        assert_eq!(work.tree().unwrap().size, 4);
        assert!(work.delete("parks").unwrap());
        assert!(work.tree().unwrap().is_empty());
    }

    // ---- typed trees ----

    #[test]
    fn type_trees_are_found() {
        let store = InMemoryObjectStore::new();
        let refs = InMemoryRefStore::new();
        let work = WorkingTree::new(&store, &refs, TreeConfig::default());
        work.create_type_tree("layers/parks", &park_type()).unwrap();
        assert!(matches!(
            work.create_type_tree("layers/parks", &park_type()),
            Err(IndexError::AlreadyExists(_))
        ));
        let typed: Vec<String> = work
            .find_feature_type_trees()
            .unwrap()
            .iter()
            .map(NodeRef::path)
            .collect();
        assert_eq!(typed, vec!["layers/parks"]);
    }

    // ---- unstaged ----

    #[test]
    fn unstaged_against_stage_head() {
        let store = InMemoryObjectStore::new();
        let refs = InMemoryRefStore::new();
        let work = WorkingTree::new(&store, &refs, TreeConfig::default());
        assert!(!work.has_unstaged().unwrap());
        work.insert_many("parks", &park_type(), five_parks()).unwrap();
        work.insert("roads", "1", &park("r", 0.0, 0.0), &park_type()).unwrap();
        assert!(work.has_unstaged().unwrap());
        assert_eq!(work.count_unstaged(&[]).unwrap(), 6);
        assert_eq!(work.count_unstaged(&["roads"]).unwrap(), 1);
    }

    #[test]
    fn concurrent_edit_is_detected() {
        let store = InMemoryObjectStore::new();
        let refs = InMemoryRefStore::new();
        let work = WorkingTree::new(&store, &refs, TreeConfig::default());
        let err = work
            .tree
            .edit(|editor, root| {
                // Another writer moves WORK_HEAD while this edit is in flight.
                refs.set(names::WORK_HEAD, gvc_refs::RefValue::Direct(ObjectId::from_bytes(b"x")))
                    .unwrap();
                Ok(editor.update(&root, "a", Some(Node::feature("a", ObjectId::from_bytes(b"f"), None, None)))?)
            })
            .unwrap_err();
        assert!(matches!(err, IndexError::Ref(RefError::CasMismatch { .. })));
    }
}
