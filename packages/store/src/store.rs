//! The per-request registry of cells and callbacks.

use std::any::type_name;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::address;
use crate::cell::{AnyCell, CellDef, Slot};
use crate::error::{Error, Result};
use crate::persistent::{InMemoryStore, PersistentStore};

/// A store shared between the scopes and cell handles of one request.
pub type SharedStore = Rc<RefCell<Store>>;

/// A registered callback.
pub type CallbackFn = Rc<dyn Fn()>;

/// Index of a cell in the store's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId(usize);

/// Outcome of [`Store::add_cell`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    /// Arena index of the canonical cell.
    pub id: CellId,
    /// Full address of the cell.
    pub address: String,
    /// True if the address was already occupied.
    pub copy: bool,
}

struct Entry {
    address: String,
    cell: Box<dyn AnyCell>,
}

/// Per-request registry mapping addresses to cells and scope keys to
/// callbacks.
///
/// Cell values live for the whole request. Index counters and callbacks are
/// reset by [`Store::flush`] between the two execution passes, so the second
/// pass computes the same addresses as the first and finds the values the
/// first pass left behind.
///
/// # Example
///
/// ```rust
/// use gospel_store::{CellDef, Store};
///
/// let mut store = Store::in_memory();
/// let a = store.add_cell("item", false, CellDef::new(|| 0));
/// let b = store.add_cell("item", false, CellDef::new(|| 0));
/// assert_eq!(a.address, "item.0");
/// assert_eq!(b.address, "item.1");
///
/// store.flush();
/// let again = store.add_cell("item", false, CellDef::new(|| 0));
/// assert_eq!(again.address, "item.0");
/// assert!(again.copy);
/// ```
pub struct Store {
    indices: HashMap<String, usize>,
    addresses: HashMap<String, CellId>,
    cells: Vec<Entry>,
    funcs: HashMap<String, Vec<CallbackFn>>,
    persistent: Box<dyn PersistentStore>,
    cleared: bool,
}

impl Store {
    /// Create a store backed by the given persistent store.
    pub fn new(persistent: impl PersistentStore + 'static) -> Self {
        Self {
            indices: HashMap::new(),
            addresses: HashMap::new(),
            cells: Vec::new(),
            funcs: HashMap::new(),
            persistent: Box::new(persistent),
            cleared: false,
        }
    }

    /// Create a store whose persistent values only live in memory.
    pub fn in_memory() -> Self {
        Self::new(InMemoryStore::new())
    }

    /// Wrap the store for sharing between scopes and handles.
    pub fn shared(self) -> SharedStore {
        Rc::new(RefCell::new(self))
    }

    /// Register a cell.
    ///
    /// Scoped cells (`global == false`) get the address `base.N` where `N`
    /// counts earlier registrations under `base` since the last flush. Global
    /// cells use `base` verbatim.
    ///
    /// If the address is taken, the stored cell stays authoritative and the
    /// registration is reported as a copy; `def` is dropped without running its
    /// generator. A new persistent cell is loaded from the persistent store; a
    /// miss keeps the generator's value.
    pub fn add_cell<T: 'static>(
        &mut self,
        base: &str,
        global: bool,
        def: CellDef<T>,
    ) -> Registration {
        let address = if global {
            base.to_string()
        } else {
            let index = self.indices.entry(base.to_string()).or_insert(0);
            let address = address::indexed(base, *index);
            *index += 1;
            address
        };

        if let Some(&id) = self.addresses.get(&address) {
            tracing::trace!(%address, "cell registered again, using canonical cell");
            return Registration {
                id,
                address,
                copy: true,
            };
        }

        let persistent = def.persistent;
        let mut slot: Slot<T> = def.into_slot();

        if persistent {
            match self.persistent.get(&address) {
                Ok(Some(value)) => {
                    if let Err(err) = slot.load_json(&address, value) {
                        tracing::warn!(%address, "ignoring stored value: {}", err);
                    }
                }
                Ok(None) => {}
                Err(err) => {
                    tracing::error!(%address, "cannot load persistent cell: {}", err);
                }
            }
        }

        let id = CellId(self.cells.len());
        tracing::debug!(%address, persistent, "registered cell");
        self.cells.push(Entry {
            address: address.clone(),
            cell: Box::new(slot),
        });
        self.addresses.insert(address.clone(), id);

        Registration {
            id,
            address,
            copy: false,
        }
    }

    /// Id of the cell at `address`, if any.
    pub fn lookup(&self, address: &str) -> Option<CellId> {
        self.addresses.get(address).copied()
    }

    /// Address of the cell with the given id.
    pub fn address(&self, id: CellId) -> Option<&str> {
        self.cells.get(id.0).map(|entry| entry.address.as_str())
    }

    fn entry(&self, id: CellId) -> Result<&Entry> {
        self.cells
            .get(id.0)
            .ok_or_else(|| Error::not_found(format!("#{}", id.0)))
    }

    fn slot_mut<T: 'static>(&mut self, id: CellId) -> Result<&mut Slot<T>> {
        let entry = self
            .cells
            .get_mut(id.0)
            .ok_or_else(|| Error::not_found(format!("#{}", id.0)))?;
        let found = entry.cell.type_name();
        let address = &entry.address;
        match entry.cell.as_any_mut().downcast_mut::<Slot<T>>() {
            Some(slot) => Ok(slot),
            None => Err(Error::TypeMismatch {
                address: address.clone(),
                expected: type_name::<T>(),
                found: found.to_string(),
            }),
        }
    }

    /// Typed read of a cell.
    pub fn get<T: Clone + 'static>(&self, id: CellId) -> Result<T> {
        let entry = self.entry(id)?;
        match entry.cell.as_any().downcast_ref::<Slot<T>>() {
            Some(slot) => Ok(slot.value.clone()),
            None => Err(Error::TypeMismatch {
                address: entry.address.clone(),
                expected: type_name::<T>(),
                found: entry.cell.type_name().to_string(),
            }),
        }
    }

    /// Typed write of a cell. The value is unchanged on error.
    pub fn set<T: 'static>(&mut self, id: CellId, value: T) -> Result<()> {
        let slot = self.slot_mut::<T>(id)?;
        slot.value = value;
        slot.initialized = true;
        Ok(())
    }

    /// Set a cell back to its generator's value.
    pub fn reset(&mut self, id: CellId) -> Result<()> {
        let entry = self
            .cells
            .get_mut(id.0)
            .ok_or_else(|| Error::not_found(format!("#{}", id.0)))?;
        entry.cell.reset();
        Ok(())
    }

    pub fn is_persistent(&self, id: CellId) -> bool {
        self.entry(id).is_ok_and(|entry| entry.cell.is_persistent())
    }

    pub fn is_initialized(&self, id: CellId) -> bool {
        self.entry(id)
            .is_ok_and(|entry| entry.cell.is_initialized())
    }

    /// Typed read by address.
    pub fn get_as<T: Clone + 'static>(&self, address: &str) -> Result<T> {
        let id = self
            .lookup(address)
            .ok_or_else(|| Error::not_found(address))?;
        self.get(id)
    }

    /// Read a cell as JSON.
    pub fn get_by_id(&self, address: &str) -> Result<Value> {
        let id = self
            .lookup(address)
            .ok_or_else(|| Error::not_found(address))?;
        let entry = self.entry(id)?;
        entry.cell.to_json(&entry.address)
    }

    /// Write a cell from JSON.
    ///
    /// Unknown addresses yield [`Error::NotFound`]; values that do not decode
    /// into the cell's type yield [`Error::TypeMismatch`] and leave the cell
    /// unchanged.
    pub fn set_by_id(&mut self, address: &str, value: Value) -> Result<()> {
        let id = self
            .lookup(address)
            .ok_or_else(|| Error::not_found(address))?;
        let entry = self
            .cells
            .get_mut(id.0)
            .ok_or_else(|| Error::not_found(address))?;
        entry.cell.load_json(address, value)
    }

    /// Register a callback under a scope key.
    ///
    /// Returns the callback's ordinal within the key, starting at 1.
    pub fn add_callback(&mut self, key: &str, callback: CallbackFn) -> usize {
        let callbacks = self.funcs.entry(key.to_string()).or_default();
        callbacks.push(callback);
        callbacks.len()
    }

    /// The `ordinal`-th callback registered under `key` in this pass.
    pub fn callback(&self, key: &str, ordinal: usize) -> Option<CallbackFn> {
        let index = ordinal.checked_sub(1)?;
        self.funcs.get(key)?.get(index).cloned()
    }

    /// Look up a callback by its full id (`<scope key>.<ordinal>`).
    pub fn callback_by_id(&self, id: &str) -> Option<CallbackFn> {
        let (key, ordinal) = address::split_ordinal(id)?;
        self.callback(key, ordinal)
    }

    /// Reset index counters and callbacks. Cell values are kept.
    pub fn flush(&mut self) {
        self.indices.clear();
        self.funcs.clear();
    }

    /// Write every persistent cell to the persistent store.
    ///
    /// Failures are logged per cell. Nothing is written after
    /// [`Store::clear`]. Returns the number of cells written.
    pub fn finalize(&mut self) -> usize {
        if self.cleared {
            return 0;
        }

        let mut written = 0;
        for entry in &self.cells {
            if !entry.cell.is_persistent() {
                continue;
            }
            let result = entry
                .cell
                .to_json(&entry.address)
                .and_then(|value| self.persistent.set(&entry.address, value));
            match result {
                Ok(()) => written += 1,
                Err(err) => {
                    tracing::error!(address = %entry.address, "cannot persist cell: {}", err)
                }
            }
        }
        written
    }

    /// Drop all persisted values and stop persisting for this request.
    pub fn clear(&mut self) {
        self.cleared = true;
        self.persistent.clear();
    }

    pub fn is_cleared(&self) -> bool {
        self.cleared
    }

    /// Addresses of all registered cells, sorted.
    pub fn addresses(&self) -> Vec<&str> {
        let mut addresses: Vec<&str> = self.addresses.keys().map(String::as_str).collect();
        addresses.sort_unstable();
        addresses
    }

    /// Scope keys that registered callbacks in the current pass, sorted.
    pub fn callback_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.funcs.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("cells", &self.addresses())
            .field("callbacks", &self.callback_keys())
            .field("cleared", &self.cleared)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn shared_memory() -> Rc<RefCell<InMemoryStore>> {
        Rc::new(RefCell::new(InMemoryStore::new()))
    }

    #[test]
    fn loop_indexing() {
        let mut store = Store::in_memory();
        let addresses: Vec<String> = (0..3)
            .map(|_| store.add_cell("item", false, CellDef::new(|| 0)).address)
            .collect();
        assert_eq!(addresses, vec!["item.0", "item.1", "item.2"]);
    }

    #[test]
    fn counters_are_per_base_key() {
        let mut store = Store::in_memory();
        assert_eq!(store.add_cell("a", false, CellDef::new(|| 0)).address, "a.0");
        assert_eq!(store.add_cell("b", false, CellDef::new(|| 0)).address, "b.0");
        assert_eq!(store.add_cell("a", false, CellDef::new(|| 0)).address, "a.1");
    }

    #[test]
    fn global_cells_are_singletons() {
        let mut store = Store::in_memory();
        let first = store.add_cell("router", true, CellDef::new(|| 1));
        let second = store.add_cell("router", true, CellDef::new(|| 2));

        assert_eq!(first.address, "router");
        assert_eq!(first.id, second.id);
        assert!(!first.copy);
        assert!(second.copy);
        assert_eq!(store.get::<i32>(first.id).unwrap(), 1);
    }

    #[test]
    fn address_determinism_across_flush() {
        let mut store = Store::in_memory();

        let pass = |store: &mut Store| -> Vec<String> {
            let mut out = Vec::new();
            for key in ["root", "root.list", "root", "root.list.0"] {
                out.push(store.add_cell(key, false, CellDef::new(|| 0)).address);
            }
            out.push(store.add_cell("router", true, CellDef::new(|| 0)).address);
            out
        };

        let first = pass(&mut store);
        store.flush();
        let second = pass(&mut store);

        assert_eq!(first, second);
        assert_eq!(
            first,
            vec!["root.0", "root.list.0", "root.1", "root.list.0.0", "router"]
        );
    }

    #[test]
    fn flush_keeps_values() {
        let mut store = Store::in_memory();
        let reg = store.add_cell("counter", false, CellDef::new(|| 0));
        store.set(reg.id, 1).unwrap();

        store.flush();

        let again = store.add_cell("counter", false, CellDef::new(|| 0));
        assert_eq!(again.address, "counter.0");
        assert!(again.copy);
        assert_eq!(store.get::<i32>(again.id).unwrap(), 1);
    }

    #[test]
    fn persistent_cells_load_on_registration() {
        let memory = shared_memory();
        memory.borrow_mut().set("root.0", json!("stored")).unwrap();

        let mut store = Store::new(memory.clone());
        let loaded = store.add_cell(
            "root",
            false,
            CellDef::new(|| "default".to_string()).persistent(true),
        );
        let missing = store.add_cell(
            "root",
            false,
            CellDef::new(|| "default".to_string()).persistent(true),
        );

        assert_eq!(store.get::<String>(loaded.id).unwrap(), "stored");
        assert!(store.is_initialized(loaded.id));
        assert_eq!(store.get::<String>(missing.id).unwrap(), "default");
        assert!(!store.is_initialized(missing.id));
    }

    #[test]
    fn undecodable_stored_value_keeps_default() {
        let memory = shared_memory();
        memory.borrow_mut().set("n", json!("not a number")).unwrap();

        let mut store = Store::new(memory);
        let reg = store.add_cell("n", true, CellDef::new(|| 4u8).persistent(true));
        assert_eq!(store.get::<u8>(reg.id).unwrap(), 4);
    }

    #[test]
    fn finalize_writes_only_persistent_cells() {
        let memory = shared_memory();
        let mut store = Store::new(memory.clone());

        let kept = store.add_cell("root", false, CellDef::new(|| 1).persistent(true));
        store.add_cell("root", false, CellDef::new(|| 2));
        store.set(kept.id, 10).unwrap();

        assert_eq!(store.finalize(), 1);
        let data = memory.borrow().data().clone();
        assert_eq!(data.len(), 1);
        assert_eq!(data.get("root.0"), Some(&json!(10)));
    }

    #[test]
    fn persistence_failures_are_logged_per_cell() {
        struct Failing;

        impl PersistentStore for Failing {
            fn get(&mut self, _key: &str) -> Result<Option<Value>> {
                Ok(None)
            }

            fn set(&mut self, key: &str, _value: Value) -> Result<()> {
                Err(Error::Persistence {
                    key: key.to_string(),
                    message: "disk full".to_string(),
                })
            }

            fn clear(&mut self) {}
        }

        let mut store = Store::new(Failing);
        store.add_cell("a", true, CellDef::new(|| 1).persistent(true));
        store.add_cell("b", true, CellDef::new(|| 2).persistent(true));
        assert_eq!(store.finalize(), 0);
    }

    #[test]
    fn clear_stops_persistence() {
        let memory = shared_memory();
        memory.borrow_mut().set("old", json!(1)).unwrap();

        let mut store = Store::new(memory.clone());
        store.add_cell("root", false, CellDef::new(|| 1).persistent(true));
        store.clear();

        assert!(store.is_cleared());
        assert_eq!(store.finalize(), 0);
        assert!(memory.borrow().is_empty());
    }

    #[test]
    fn address_misses_are_not_found() {
        let mut store = Store::in_memory();
        assert!(store.get_by_id("nope").unwrap_err().is_not_found());
        assert!(store.set_by_id("nope", json!(1)).unwrap_err().is_not_found());
        assert!(store.get_as::<i32>("nope").unwrap_err().is_not_found());
    }

    #[test]
    fn set_by_id_with_wrong_type_keeps_value() {
        let mut store = Store::in_memory();
        let reg = store.add_cell("root", false, CellDef::new(|| 3i64));

        let err = store.set_by_id("root.0", json!("three")).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
        assert_eq!(store.get::<i64>(reg.id).unwrap(), 3);

        store.set_by_id("root.0", json!(4)).unwrap();
        assert_eq!(store.get_by_id("root.0").unwrap(), json!(4));
    }

    #[test]
    fn opaque_cells_have_no_json_form() {
        let mut store = Store::in_memory();
        store.add_cell("h", true, CellDef::opaque(|| Rc::new(5)));
        assert!(matches!(store.get_by_id("h"), Err(Error::Unsupported { .. })));
    }

    #[test]
    fn callbacks_are_ordered_and_flushed() {
        use std::cell::Cell;

        let mut store = Store::in_memory();
        let hits = Rc::new(Cell::new(0));

        let first = store.add_callback("root.form", {
            let hits = hits.clone();
            Rc::new(move || hits.set(hits.get() + 1))
        });
        let second = store.add_callback("root.form", Rc::new(|| {}));
        assert_eq!((first, second), (1, 2));

        let callback = store.callback_by_id("root.form.1").unwrap();
        callback();
        assert_eq!(hits.get(), 1);

        assert!(store.callback("root.form", 0).is_none());
        assert!(store.callback_by_id("root.form.3").is_none());

        store.flush();
        assert!(store.callback_keys().is_empty());
        assert!(store.callback_by_id("root.form.1").is_none());
    }
}
