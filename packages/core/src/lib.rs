//! Gospel Core: scopes and the two-pass execution model
//!
//! Built on `gospel-store`, this crate provides what render functions work
//! with during a request:
//! - `Scope`: tree-positioned handle for registering cells and callbacks
//! - `Scope::execute`: interactive pass, flush, pure pass, finalize
//! - `Node`: the output tree
//! - `Callback` / `FormData`: form submissions correlated with their handlers
//! - `Registry` / `ResourcePool`: process-wide state shared between requests
//!
//! # Example
//!
//! ```rust
//! use gospel_core::node::{div, p, Node};
//! use gospel_core::{Request, Scope};
//! use gospel_store::Store;
//!
//! fn counter(scope: &Scope) -> gospel_core::Result<Node> {
//!     let count = scope.child("counter").var(0u32);
//!     let increment = scope.register_callback({
//!         let count = count.clone();
//!         move || {
//!             if let Err(err) = count.update(|n| *n += 1) {
//!                 tracing::warn!("cannot increment counter: {}", err);
//!             }
//!         }
//!     });
//!     increment.on_submit();
//!     Ok(div()
//!         .child(p().child(count.get().to_string()))
//!         .child(increment.form([Node::text("+")]))
//!         .into())
//! }
//!
//! let scope = Scope::root(Request::default(), Store::in_memory().shared());
//! let outcome = scope.execute(counter).unwrap();
//! assert!(outcome.body().unwrap().starts_with("<div><p>0</p>"));
//! ```

mod callback;
mod context;
mod error;
mod execute;
mod forms;
pub mod node;
mod pool;
mod registry;
mod request;
mod values;

pub use callback::Callback;
pub use context::{Responder, Scope};
pub use error::{Error, Result};
pub use execute::{Outcome, Phase};
pub use forms::FormData;
pub use node::{Element, Node, Render};
pub use pool::{Closeable, ResourcePool};
pub use registry::{Component, Registry, RegistryBuilder};
pub use request::{Request, CORRELATION_FIELD};
pub use values::Values;
