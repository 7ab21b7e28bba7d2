//! Persistence contract for cells that outlive a request.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use serde_json::Value;

use crate::error::Result;

/// Reads and writes serialized cell values by address.
///
/// The engine only relies on this get/set/clear contract; the storage medium
/// (a cookie, a session table, memory) is up to the implementation.
pub trait PersistentStore {
    /// Load the value stored under `key`.
    ///
    /// # Returns
    ///
    /// * `Ok(None)` - Nothing is stored under the key.
    /// * `Ok(Some(value))` - The serialized value.
    /// * `Err(Error)` - The medium could not be read.
    fn get(&mut self, key: &str) -> Result<Option<Value>>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&mut self, key: &str, value: Value) -> Result<()>;

    /// Drop everything stored.
    fn clear(&mut self);
}

// Blanket implementations for references, boxes and shared handles

impl<T: PersistentStore + ?Sized> PersistentStore for &mut T {
    fn get(&mut self, key: &str) -> Result<Option<Value>> {
        (*self).get(key)
    }

    fn set(&mut self, key: &str, value: Value) -> Result<()> {
        (*self).set(key, value)
    }

    fn clear(&mut self) {
        (*self).clear()
    }
}

impl<T: PersistentStore + ?Sized> PersistentStore for Box<T> {
    fn get(&mut self, key: &str) -> Result<Option<Value>> {
        self.as_mut().get(key)
    }

    fn set(&mut self, key: &str, value: Value) -> Result<()> {
        self.as_mut().set(key, value)
    }

    fn clear(&mut self) {
        self.as_mut().clear()
    }
}

/// Lets the caller keep a handle on the persistent store it hands to a
/// [`Store`](crate::Store), e.g. to write a session cookie afterwards.
impl<T: PersistentStore + ?Sized> PersistentStore for Rc<RefCell<T>> {
    fn get(&mut self, key: &str) -> Result<Option<Value>> {
        self.borrow_mut().get(key)
    }

    fn set(&mut self, key: &str, value: Value) -> Result<()> {
        self.borrow_mut().set(key, value)
    }

    fn clear(&mut self) {
        self.borrow_mut().clear()
    }
}

/// A persistent store that keeps values in memory.
///
/// # Example
///
/// ```rust
/// use gospel_store::{InMemoryStore, PersistentStore};
/// use serde_json::json;
///
/// let mut store = InMemoryStore::new();
/// store.set("root.0", json!(3)).unwrap();
/// assert_eq!(store.get("root.0").unwrap(), Some(json!(3)));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InMemoryStore {
    data: BTreeMap<String, Value>,
}

impl InMemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with initial data.
    pub fn with_data(data: BTreeMap<String, Value>) -> Self {
        Self { data }
    }

    /// Everything currently stored.
    pub fn data(&self) -> &BTreeMap<String, Value> {
        &self.data
    }

    pub fn into_data(self) -> BTreeMap<String, Value> {
        self.data
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl PersistentStore for InMemoryStore {
    fn get(&mut self, key: &str) -> Result<Option<Value>> {
        Ok(self.data.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: Value) -> Result<()> {
        self.data.insert(key.to_string(), value);
        Ok(())
    }

    fn clear(&mut self) {
        self.data.clear();
    }
}
