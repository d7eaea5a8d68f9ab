use fit_types::ObjectId;

use crate::error::StoreResult;
use crate::object::StoredObject;

/// Content-addressed object store.
///
/// All implementations must satisfy these invariants:
/// - Objects are immutable once written. The same kind and payload always
///   produce the same ID.
/// - Writing an object that already exists is a no-op.
/// - `read` of an absent ID fails with [`crate::StoreError::NotFound`].
/// - All I/O errors are propagated, never silently ignored.
pub trait ObjectStore: Send + Sync {
    /// Read an object by its content-addressed ID.
    fn read(&self, id: &ObjectId) -> StoreResult<StoredObject>;

    /// Write an object and return its content-addressed ID.
    fn write(&self, object: &StoredObject) -> StoreResult<ObjectId>;

    /// Check whether an object exists in the store.
    fn exists(&self, id: &ObjectId) -> StoreResult<bool>;

    /// Delete an object by ID. Returns `true` if the object existed.
    ///
    /// This is intended for garbage collection only. Deleting a referenced
    /// object leaves dangling references behind.
    fn delete(&self, id: &ObjectId) -> StoreResult<bool>;

    /// Enumerate every stored object ID, sorted.
    fn list(&self) -> StoreResult<Vec<ObjectId>>;

    /// Read an object, mapping `NotFound` to `None`.
    fn try_read(&self, id: &ObjectId) -> StoreResult<Option<StoredObject>> {
        match self.read(id) {
            Ok(obj) => Ok(Some(obj)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}
