//! Fixtures shared by the unit tests.

use std::sync::Mutex;

use gvc_refs::{InMemoryRefStore, RefStore, RefValue};
use gvc_store::{
    AttributeDescriptor, Geometry, ObjectStoreExt, RevFeature, RevFeatureType, Value, ValueKind,
};
use gvc_types::ObjectId;

use crate::checkout::CheckoutOptions;
use crate::config::RepositoryConfig;
use crate::context::RepoContext;
use crate::repository::Repository;

pub fn repo() -> Repository {
    Repository::in_memory(RepositoryConfig::default()).unwrap()
}

pub fn park_type() -> RevFeatureType {
    RevFeatureType::new(
        "park",
        vec![
            AttributeDescriptor::new("name", ValueKind::Text, false),
            AttributeDescriptor::new("geom", ValueKind::Geometry, true),
        ],
    )
}

pub fn park(name: &str, x: f64, y: f64) -> RevFeature {
    RevFeature::new(vec![
        Value::Text(name.to_string()),
        Value::Geometry(Geometry::point(x, y)),
    ])
}

pub fn five_parks() -> Vec<(String, RevFeature)> {
    (1..=5)
        .map(|i| (i.to_string(), park(&format!("park {i}"), f64::from(i), 0.0)))
        .collect()
}

/// Insert `parks/<id>` named `park <id>` for each id, stage everything and
/// commit.
pub fn commit_parks(ctx: &RepoContext, ids: &[&str], message: &str) -> ObjectId {
    let parks = ids.iter().map(|id| {
        let x = id.parse::<f64>().unwrap_or(0.0);
        (id.to_string(), park(&format!("park {id}"), x, 0.0))
    });
    ctx.work().insert_many("parks", &park_type(), parks).unwrap();
    ctx.add(&[]).unwrap();
    ctx.commit(message).unwrap()
}

/// Rename `parks/<id>` and commit just that change.
pub fn edit_park(ctx: &RepoContext, id: &str, name: &str, message: &str) -> ObjectId {
    let x = id.parse::<f64>().unwrap_or(0.0);
    ctx.work()
        .insert("parks", id, &park(name, x, 0.0), &park_type())
        .unwrap();
    let path = format!("parks/{id}");
    ctx.add(&[path.as_str()]).unwrap();
    ctx.commit(message).unwrap()
}

pub fn switch(ctx: &RepoContext, branch: &str) {
    ctx.checkout(&CheckoutOptions::branch(branch)).unwrap();
}

/// Name attribute of the park at `<ref>:<path>`.
pub fn park_name(ctx: &RepoContext, spec: &str) -> String {
    let node = ctx.resolve_node(spec).unwrap();
    let feature = ctx.store().get_feature(&node.object_id()).unwrap();
    match &feature.values[0] {
        Value::Text(name) => name.clone(),
        other => panic!("unexpected name value {other:?}"),
    }
}

type WriteHook = Box<dyn FnOnce(&InMemoryRefStore) -> gvc_refs::Result<()> + Send>;

/// Ref store that runs a one-shot hook right before the first write to one
/// ref. A failing hook fails that write.
pub struct HookedRefs {
    inner: InMemoryRefStore,
    hook: Mutex<Option<(String, WriteHook)>>,
}

impl HookedRefs {
    pub fn new() -> Self {
        Self {
            inner: InMemoryRefStore::new(),
            hook: Mutex::new(None),
        }
    }

    pub fn before_write<F>(&self, name: &str, hook: F)
    where
        F: FnOnce(&InMemoryRefStore) -> gvc_refs::Result<()> + Send + 'static,
    {
        *self.hook.lock().unwrap() = Some((name.to_string(), Box::new(hook)));
    }

    pub fn fired(&self) -> bool {
        self.hook.lock().unwrap().is_none()
    }
}

impl RefStore for HookedRefs {
    fn read(&self, name: &str) -> gvc_refs::Result<Option<RefValue>> {
        self.inner.read(name)
    }

    fn compare_and_swap(
        &self,
        name: &str,
        expected: Option<&RefValue>,
        new: Option<RefValue>,
    ) -> gvc_refs::Result<()> {
        let hook = {
            let mut slot = self.hook.lock().unwrap();
            match slot.as_ref() {
                Some((target, _)) if target == name => slot.take().map(|(_, hook)| hook),
                _ => None,
            }
        };
        if let Some(hook) = hook {
            hook(&self.inner)?;
        }
        self.inner.compare_and_swap(name, expected, new)
    }

    fn list(&self, prefix: &str) -> gvc_refs::Result<Vec<(String, RefValue)>> {
        self.inner.list(prefix)
    }
}
