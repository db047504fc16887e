//! In-memory reference store.
//!
//! [`InMemoryRefStore`] keeps all refs in a `BTreeMap` behind a `RwLock`.
//! Transactions use [`InMemoryRefStore::from_snapshot`] to get a private copy
//! of a repository's refs.

use std::collections::BTreeMap;
use std::sync::RwLock;

use tracing::debug;

use crate::error::{RefError, Result};
use crate::names::{validate_ref_name, TAGS_PREFIX};
use crate::traits::RefStore;
use crate::types::RefValue;

#[derive(Debug, Default)]
pub struct InMemoryRefStore {
    refs: RwLock<BTreeMap<String, RefValue>>,
}

impl InMemoryRefStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `refs`, e.g. another store's snapshot.
    pub fn from_snapshot<I>(refs: I) -> Self
    where
        I: IntoIterator<Item = (String, RefValue)>,
    {
        Self {
            refs: RwLock::new(refs.into_iter().collect()),
        }
    }
}

impl RefStore for InMemoryRefStore {
    fn read(&self, name: &str) -> Result<Option<RefValue>> {
        let refs = self.refs.read().map_err(|_| RefError::LockPoisoned)?;
        Ok(refs.get(name).cloned())
    }

    fn compare_and_swap(
        &self,
        name: &str,
        expected: Option<&RefValue>,
        new: Option<RefValue>,
    ) -> Result<()> {
        validate_ref_name(name)?;
        let mut refs = self.refs.write().map_err(|_| RefError::LockPoisoned)?;
        let actual = refs.get(name);
        if actual != expected {
            return Err(RefError::CasMismatch {
                name: name.to_string(),
                expected: expected.cloned(),
                actual: actual.cloned(),
            });
        }
        if name.starts_with(TAGS_PREFIX) && actual.is_some() && new.is_some() {
            return Err(RefError::TagImmutable {
                name: name.to_string(),
            });
        }
        match new {
            Some(value) => {
                debug!(name, value = %value, "ref updated");
                refs.insert(name.to_string(), value);
            }
            None => {
                debug!(name, "ref deleted");
                refs.remove(name);
            }
        }
        Ok(())
    }

    fn list(&self, prefix: &str) -> Result<Vec<(String, RefValue)>> {
        let refs = self.refs.read().map_err(|_| RefError::LockPoisoned)?;
        Ok(refs
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}
