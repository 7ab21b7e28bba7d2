//! Typed state cells and the handles used to reach them.
//!
//! A cell is declared with a [`CellDef`] and registered in a
//! [`Store`](crate::Store). Registration hands back a [`Var`], a cheap handle
//! that reads and writes through the store. Registering twice at the same
//! address yields two handles onto the same canonical cell; the second is
//! marked as a copy.

use std::any::{type_name, Any};
use std::fmt;
use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::store::{CellId, SharedStore};

/// Produces a cell's default value; also used by [`Var::reset`].
pub type Generator<T> = Rc<dyn Fn() -> T>;

/// Conversion between a cell value and JSON.
///
/// This is the only untyped path into a cell: persistence and form binding go
/// through it, everything else uses the typed API.
struct Bridge<T> {
    encode: fn(&T) -> serde_json::Result<Value>,
    decode: fn(Value) -> serde_json::Result<T>,
}

impl<T> Clone for Bridge<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Bridge<T> {}

fn encode_json<T: Serialize>(value: &T) -> serde_json::Result<Value> {
    serde_json::to_value(value)
}

fn decode_json<T: DeserializeOwned>(value: Value) -> serde_json::Result<T> {
    serde_json::from_value(value)
}

/// Declaration of a cell before it is registered.
pub struct CellDef<T> {
    pub(crate) generator: Generator<T>,
    bridge: Option<Bridge<T>>,
    pub(crate) persistent: bool,
}

impl<T: Serialize + DeserializeOwned + 'static> CellDef<T> {
    /// A cell whose value can be persisted and bound from form data.
    pub fn new(generator: impl Fn() -> T + 'static) -> Self {
        Self {
            generator: Rc::new(generator),
            bridge: Some(Bridge {
                encode: encode_json::<T>,
                decode: decode_json::<T>,
            }),
            persistent: false,
        }
    }

    /// Mark the cell as persistent: it is loaded from the persistent store
    /// when first registered and written back when the request finishes.
    #[must_use]
    pub fn persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }
}

impl<T: 'static> CellDef<T> {
    /// A cell for values that have no JSON form, e.g. handles and closures.
    pub fn opaque(generator: impl Fn() -> T + 'static) -> Self {
        Self {
            generator: Rc::new(generator),
            bridge: None,
            persistent: false,
        }
    }

    pub(crate) fn into_slot(self) -> Slot<T> {
        Slot {
            value: (self.generator)(),
            generator: self.generator,
            bridge: self.bridge,
            persistent: self.persistent,
            initialized: false,
        }
    }
}

/// The canonical storage for one address.
pub(crate) struct Slot<T> {
    pub(crate) value: T,
    generator: Generator<T>,
    bridge: Option<Bridge<T>>,
    persistent: bool,
    pub(crate) initialized: bool,
}

/// Type-erased view of a [`Slot`] so the store can hold cells of any type.
pub(crate) trait AnyCell {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn type_name(&self) -> &'static str;
    fn is_persistent(&self) -> bool;
    fn is_initialized(&self) -> bool;
    fn to_json(&self, address: &str) -> Result<Value>;
    fn load_json(&mut self, address: &str, value: Value) -> Result<()>;
    fn reset(&mut self);
}

impl<T: 'static> AnyCell for Slot<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn is_persistent(&self) -> bool {
        self.persistent
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn to_json(&self, address: &str) -> Result<Value> {
        let bridge = self.bridge.ok_or_else(|| Error::Unsupported {
            address: address.to_string(),
        })?;
        Ok((bridge.encode)(&self.value)?)
    }

    fn load_json(&mut self, address: &str, value: Value) -> Result<()> {
        let bridge = self.bridge.ok_or_else(|| Error::Unsupported {
            address: address.to_string(),
        })?;
        let found = json_kind(&value);
        // the current value stays in place if decoding fails
        let decoded = (bridge.decode)(value).map_err(|_| Error::TypeMismatch {
            address: address.to_string(),
            expected: type_name::<T>(),
            found,
        })?;
        self.value = decoded;
        self.initialized = true;
        Ok(())
    }

    fn reset(&mut self) {
        self.value = (self.generator)();
        self.initialized = true;
    }
}

fn json_kind(value: &Value) -> String {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
    .to_string()
}

/// Handle onto a registered cell.
///
/// All reads and writes go through the store by id, so every handle at the
/// same address observes the same value regardless of which registration
/// created it.
///
/// # Example
///
/// ```rust
/// use gospel_store::{CellDef, Store, Var};
///
/// let store = Store::in_memory().shared();
/// let counter = Var::register(&store, "root", "root", false, CellDef::new(|| 0i64));
/// counter.update(|v| *v += 1).unwrap();
///
/// let again = Var::register(&store, "root", "root", true, CellDef::new(|| 0i64));
/// // a global registration at "root" is a different address
/// assert_eq!(again.id(), "root");
/// assert_eq!(counter.id(), "root.0");
/// assert_eq!(counter.get(), 1);
/// ```
pub struct Var<T> {
    store: SharedStore,
    id: CellId,
    address: String,
    scope_key: String,
    copy: bool,
    generator: Generator<T>,
}

impl<T: 'static> Var<T> {
    /// Register `def` under `base` and return a handle to the canonical cell.
    ///
    /// `scope_key` is the key of the registering scope; it only affects
    /// [`Var::scoped_id`].
    pub fn register(
        store: &SharedStore,
        scope_key: &str,
        base: &str,
        global: bool,
        def: CellDef<T>,
    ) -> Self {
        let generator = def.generator.clone();
        let registration = store.borrow_mut().add_cell(base, global, def);
        Self {
            store: store.clone(),
            id: registration.id,
            address: registration.address,
            scope_key: scope_key.to_string(),
            copy: registration.copy,
            generator,
        }
    }

    /// Replace the value.
    ///
    /// Fails with [`Error::TypeMismatch`] if the canonical cell at this
    /// address was declared with another type; the stored value is left
    /// unchanged.
    pub fn set(&self, value: T) -> Result<()> {
        self.store.borrow_mut().set(self.id, value)
    }

    /// Set the value back to what the generator produces.
    pub fn reset(&self) -> Result<()> {
        self.store.borrow_mut().reset(self.id)
    }

    /// Full address of the cell, e.g. `root.list.3.0`.
    pub fn id(&self) -> &str {
        &self.address
    }

    /// Address relative to the registering scope.
    ///
    /// Global cells return their full address.
    pub fn scoped_id(&self) -> &str {
        crate::address::scoped(&self.address, &self.scope_key)
    }

    /// True if another registration already owned this address.
    pub fn is_copy(&self) -> bool {
        self.copy
    }

    pub fn is_persistent(&self) -> bool {
        self.store.borrow().is_persistent(self.id)
    }

    /// True once the value was loaded from persistence or written.
    pub fn is_initialized(&self) -> bool {
        self.store.borrow().is_initialized(self.id)
    }
}

impl<T: Clone + 'static> Var<T> {
    /// Current value.
    ///
    /// If the canonical cell holds another type, the mismatch is logged and the
    /// generator's value is returned.
    pub fn get(&self) -> T {
        match self.try_get() {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(address = %self.address, "cannot read cell: {}", err);
                (self.generator)()
            }
        }
    }

    /// Current value, or the type mismatch that prevents reading it.
    pub fn try_get(&self) -> Result<T> {
        self.store.borrow().get(self.id)
    }

    /// Modify the value.
    ///
    /// `f` works on a copy that is written back afterwards; the store is not
    /// borrowed while it runs, so it may read and write other cells.
    pub fn update(&self, f: impl FnOnce(&mut T)) -> Result<()> {
        let mut value = self.try_get()?;
        f(&mut value);
        self.set(value)
    }
}

impl<T> Clone for Var<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            id: self.id,
            address: self.address.clone(),
            scope_key: self.scope_key.clone(),
            copy: self.copy,
            generator: self.generator.clone(),
        }
    }
}

impl<T> fmt::Debug for Var<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Var")
            .field("address", &self.address)
            .field("copy", &self.copy)
            .field("type", &type_name::<T>())
            .finish()
    }
}
