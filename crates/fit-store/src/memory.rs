use std::collections::BTreeMap;
use std::sync::RwLock;

use fit_types::ObjectId;

use crate::error::{StoreError, StoreResult};
use crate::object::StoredObject;
use crate::traits::ObjectStore;

/// Object store that never touches disk.
///
/// Backs daemons and sync sessions in tests. Objects are keyed by id in a
/// `BTreeMap`, so `list` comes back in id order without sorting.
#[derive(Default)]
pub struct InMemoryObjectStore {
    by_id: RwLock<BTreeMap<ObjectId, StoredObject>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.by_id.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn read(&self, id: &ObjectId) -> StoreResult<StoredObject> {
        self.by_id
            .read()
            .expect("lock poisoned")
            .get(id)
            .cloned()
            .ok_or(StoreError::NotFound(*id))
    }

    fn write(&self, object: &StoredObject) -> StoreResult<ObjectId> {
        let id = object.compute_id();
        self.by_id
            .write()
            .expect("lock poisoned")
            .entry(id)
            .or_insert_with(|| object.clone());
        Ok(id)
    }

    fn exists(&self, id: &ObjectId) -> StoreResult<bool> {
        Ok(self.by_id.read().expect("lock poisoned").contains_key(id))
    }

    fn delete(&self, id: &ObjectId) -> StoreResult<bool> {
        Ok(self.by_id.write().expect("lock poisoned").remove(id).is_some())
    }

    fn list(&self) -> StoreResult<Vec<ObjectId>> {
        Ok(self.by_id.read().expect("lock poisoned").keys().copied().collect())
    }
}

impl std::fmt::Debug for InMemoryObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryObjectStore")
            .field("objects", &self.len())
            .finish()
    }
}
