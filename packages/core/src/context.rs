//! The scope handle through which render functions reach request state.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use gospel_store::{address, CellDef, SharedStore, Var};

use crate::callback::Callback;
use crate::error::{Error, Result};
use crate::execute::Phase;
use crate::node::Node;
use crate::registry::Registry;
use crate::request::Request;

/// Produces the whole response in place of the rendered tree.
pub type Responder = Rc<dyn Fn(&Scope) -> http::Response<Bytes>>;

/// State owned by the root scope and shared by every scope of a request.
struct Root {
    store: SharedStore,
    request: Request,
    registry: Arc<Registry>,
    interactive: Cell<bool>,
    phase: Cell<Phase>,
    status: Cell<StatusCode>,
    headers: RefCell<HeaderMap>,
    responder: RefCell<Option<Responder>>,
    redirect: RefCell<Option<String>>,
}

/// A position in the render tree.
///
/// Scopes are cheap to clone and own nothing but their key; everything else
/// lives in the root shared by all scopes of one request. Cells and callbacks
/// registered through a scope are addressed by its key, so the same call
/// sequence in both passes lands on the same addresses.
///
/// # Example
///
/// ```rust
/// use gospel_core::{Request, Scope};
/// use gospel_store::Store;
///
/// let scope = Scope::root(Request::default(), Store::in_memory().shared());
/// let title = scope.enter("list", |list| list.child("3").var("draft".to_string()));
/// assert_eq!(title.id(), "root.list.3.0");
/// ```
#[derive(Clone)]
pub struct Scope {
    key: String,
    root: Rc<Root>,
}

impl Scope {
    /// The root scope of a request, keyed `root`.
    pub fn root(request: Request, store: SharedStore) -> Self {
        Self::with_registry(request, store, Arc::new(Registry::default()))
    }

    /// The root scope of a request with access to shared components.
    pub fn with_registry(request: Request, store: SharedStore, registry: Arc<Registry>) -> Self {
        Self {
            key: address::ROOT_KEY.to_string(),
            root: Rc::new(Root {
                store,
                request,
                registry,
                interactive: Cell::new(false),
                phase: Cell::new(Phase::Created),
                status: Cell::new(StatusCode::OK),
                headers: RefCell::new(HeaderMap::new()),
                responder: RefCell::new(None),
                redirect: RefCell::new(None),
            }),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Scope keyed `self.key + "." + key`.
    pub fn child(&self, key: impl fmt::Display) -> Scope {
        Scope {
            key: address::child(&self.key, key),
            root: self.root.clone(),
        }
    }

    /// Scope at an absolute key, sharing this request's root.
    pub fn scope(&self, key: impl Into<String>) -> Scope {
        Scope {
            key: key.into(),
            root: self.root.clone(),
        }
    }

    /// Run `f` in the child scope `key`.
    pub fn enter<T>(&self, key: impl fmt::Display, f: impl FnOnce(&Scope) -> T) -> T {
        f(&self.child(key))
    }

    /// Render a component in the child scope `key`.
    ///
    /// A failing component is logged and renders as an empty node.
    pub fn render(&self, key: impl fmt::Display, f: impl FnOnce(&Scope) -> Result<Node>) -> Node {
        let child = self.child(key);
        match f(&child) {
            Ok(node) => node,
            Err(err) => {
                tracing::error!(scope = %child.key, "component failed: {}", err);
                Node::Empty
            }
        }
    }

    /// A node rendered from the child scope `key` once the pure pass is done.
    pub fn defer(
        &self,
        key: impl fmt::Display,
        f: impl Fn(&Scope) -> Result<Node> + 'static,
    ) -> Node {
        let child = self.child(key);
        Node::lazy(move || match f(&child) {
            Ok(node) => node,
            Err(err) => {
                tracing::error!(scope = %child.key, "deferred component failed: {}", err);
                Node::Empty
            }
        })
    }

    /// Register a cell.
    ///
    /// An empty `key` registers a cell scoped to this scope's key; any other
    /// key is used verbatim as a global address.
    pub fn register_cell<T: 'static>(&self, def: CellDef<T>, key: &str) -> Var<T> {
        let (base, global) = if key.is_empty() {
            (self.key.as_str(), false)
        } else {
            (key, true)
        };
        Var::register(&self.root.store, &self.key, base, global, def)
    }

    /// Register a callback under this scope's key.
    ///
    /// The callback id is `key.N`, `N` counting from 1 within the pass.
    pub fn register_callback(&self, f: impl Fn() + 'static) -> Callback {
        let f: Rc<dyn Fn()> = Rc::new(f);
        let ordinal = self
            .root
            .store
            .borrow_mut()
            .add_callback(&self.key, f.clone());
        Callback::new(address::indexed(&self.key, ordinal), self.clone(), f)
    }

    /// Scoped cell holding `value` until changed.
    pub fn var<T>(&self, value: T) -> Var<T>
    where
        T: Clone + Serialize + DeserializeOwned + 'static,
    {
        self.cached_var(move || value.clone())
    }

    /// Scoped cell computed by `generator` when first registered.
    pub fn cached_var<T>(&self, generator: impl Fn() -> T + 'static) -> Var<T>
    where
        T: Serialize + DeserializeOwned + 'static,
    {
        self.register_cell(CellDef::new(generator), "")
    }

    /// Scoped cell that survives the request through the persistent store.
    pub fn persistent_var<T>(&self, value: T) -> Var<T>
    where
        T: Clone + Serialize + DeserializeOwned + 'static,
    {
        self.register_cell(CellDef::new(move || value.clone()).persistent(true), "")
    }

    /// Global cell that survives the request through the persistent store.
    pub fn persistent_global_var<T>(&self, key: &str, value: T) -> Var<T>
    where
        T: Clone + Serialize + DeserializeOwned + 'static,
    {
        self.register_cell(CellDef::new(move || value.clone()).persistent(true), key)
    }

    /// Cell at `self.key + "." + name`, independent of registration order.
    pub fn named_var<T>(&self, name: &str, value: T) -> Result<Var<T>>
    where
        T: Clone + Serialize + DeserializeOwned + 'static,
    {
        if name.is_empty() {
            return Err(Error::render(format!("empty cell name in scope '{}'", self.key)));
        }
        Ok(self.global_var(&address::child(&self.key, name), value))
    }

    /// Cell at the global address `key`; the first registration wins.
    ///
    /// An empty `key` registers a scoped cell.
    pub fn global_var<T>(&self, key: &str, value: T) -> Var<T>
    where
        T: Clone + Serialize + DeserializeOwned + 'static,
    {
        self.register_cell(CellDef::new(move || value.clone()), key)
    }

    /// Value of the cell at `address`, if it exists and holds a `T`.
    pub fn use_global<T: Clone + 'static>(&self, address: &str) -> Option<T> {
        self.root.store.borrow().get_as::<T>(address).ok()
    }

    /// Scoped cell for a value without a serialized form.
    pub fn local<T: Clone + 'static>(&self, value: T) -> Var<T> {
        self.register_cell(CellDef::opaque(move || value.clone()), "")
    }

    /// Global cell for a value without a serialized form.
    pub fn global_local<T: Clone + 'static>(&self, key: &str, value: T) -> Var<T> {
        self.register_cell(CellDef::opaque(move || value.clone()), key)
    }

    /// Read a cell as JSON by its full address.
    pub fn get_by_id(&self, address: &str) -> Result<Value> {
        Ok(self.root.store.borrow().get_by_id(address)?)
    }

    /// Write a cell from JSON by its full address.
    pub fn set_by_id(&self, address: &str, value: Value) -> Result<()> {
        Ok(self.root.store.borrow_mut().set_by_id(address, value)?)
    }

    /// Invoke the callback registered as `id` in the current pass.
    ///
    /// Returns whether a callback fired; nothing fires outside the
    /// interactive pass.
    pub fn call_by_id(&self, id: &str) -> bool {
        let callback = self.root.store.borrow().callback_by_id(id);
        match callback {
            Some(f) if self.interactive() => {
                f();
                true
            }
            Some(_) => false,
            None => {
                tracing::debug!(id, "no callback registered");
                false
            }
        }
    }

    pub fn request(&self) -> &Request {
        &self.root.request
    }

    /// True while callbacks may fire.
    pub fn interactive(&self) -> bool {
        self.root.interactive.get()
    }

    pub(crate) fn set_interactive(&self, interactive: bool) {
        self.root.interactive.set(interactive);
    }

    pub fn phase(&self) -> Phase {
        self.root.phase.get()
    }

    pub(crate) fn set_phase(&self, phase: Phase) {
        tracing::trace!(?phase, "entering phase");
        self.root.phase.set(phase);
    }

    pub fn status_code(&self) -> StatusCode {
        self.root.status.get()
    }

    pub fn set_status_code(&self, status: StatusCode) {
        self.root.status.set(status);
    }

    /// Add a header to the rendered or redirect response.
    pub fn insert_header(&self, name: HeaderName, value: HeaderValue) {
        self.root.headers.borrow_mut().insert(name, value);
    }

    pub fn headers(&self) -> HeaderMap {
        self.root.headers.borrow().clone()
    }

    /// Let `f` produce the response instead of the rendered tree.
    pub fn set_responder(&self, f: impl Fn(&Scope) -> http::Response<Bytes> + 'static) {
        *self.root.responder.borrow_mut() = Some(Rc::new(f));
    }

    pub fn responder(&self) -> Option<Responder> {
        self.root.responder.borrow().clone()
    }

    /// Answer with a redirect to `location` unless it is the current page.
    pub fn redirect_to(&self, location: impl Into<String>) {
        *self.root.redirect.borrow_mut() = Some(location.into());
    }

    pub fn redirected_to(&self) -> Option<String> {
        self.root.redirect.borrow().clone()
    }

    /// Drop every persisted value and stop persisting for this request.
    pub fn clear_session(&self) {
        self.root.store.borrow_mut().clear();
    }

    pub fn registry(&self) -> &Registry {
        &self.root.registry
    }

    /// Render the registered component `name` in the child scope `name`.
    ///
    /// Unknown names are logged and render empty.
    pub fn render_component(&self, name: &str) -> Node {
        match self.root.registry.get(name) {
            Some(component) => {
                let component = component.clone();
                self.render(name, move |scope| component(scope))
            }
            None => {
                tracing::warn!(name, scope = %self.key, "unknown component");
                Node::Empty
            }
        }
    }

    pub fn store(&self) -> &SharedStore {
        &self.root.store
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("key", &self.key)
            .field("interactive", &self.interactive())
            .field("phase", &self.phase())
            .finish()
    }
}
