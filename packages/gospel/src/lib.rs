//! Gospel: server-driven UI with addressed state.
//!
//! Every request builds a node tree twice against one store. The first,
//! interactive pass lets callbacks react to the submitted form; the second,
//! pure pass renders the resulting state. State cells are addressed by their
//! position in the tree, so both passes see the same cells.
//!
//! The workspace is layered:
//! - `gospel-store`: cells, addresses, persistence
//! - `gospel-core`: scopes, execution, nodes, forms
//! - `gospel-router`: nested routing
//! - `gospel-http`: sessions and request handling
//!
//! This crate re-exports all of them.
//!
//! # Example
//!
//! ```rust
//! use gospel::prelude::*;
//!
//! fn app(scope: &Scope) -> gospel::Result<Node> {
//!     let name = scope.var("world".to_string());
//!     use_router(scope).matches(
//!         scope,
//!         &[Route::new("/hello", move |_| Ok(p().child(format!("hello {}", name.get())).into()))],
//!     )
//! }
//!
//! let request = http::Request::get("/hello").body(bytes::Bytes::new()).unwrap();
//! let response = App::new(app).handle(request);
//! assert_eq!(&response.body()[..], b"<p>hello world</p>");
//! ```

pub use gospel_core::{
    node, Callback, Closeable, Component, Element, Error, FormData, Node, Outcome, Phase, Registry,
    RegistryBuilder, Render, Request, ResourcePool, Responder, Result, Scope, Values,
    CORRELATION_FIELD,
};
pub use gospel_http::{App, CookieStore, Error as HttpError, RootFn, ServerConfig};
pub use gospel_router::{use_router, Frame, Route, Router, Target, ROUTER_KEY};
pub use gospel_store::{
    address, CellDef, Error as StoreError, InMemoryStore, PersistentStore, SharedStore, Store, Var,
};

pub mod prelude {
    pub use crate::node::{a, button, div, form, input, p, span};
    pub use crate::{use_router, App, Node, Route, Scope, Var};
}
