//! Gospel Store: per-request state
//!
//! This layer holds the state a render pass works with:
//! - `Store`: registry of cells by address and callbacks by scope key
//! - `CellDef` / `Var`: typed cells and the handles used to read and write them
//! - `PersistentStore`: contract for values that outlive the request
//! - `address`: the dotted key scheme shared by scopes, cells and callbacks
//!
//! Nothing here knows about HTTP or rendering; see `gospel-core` for the
//! scope handle and execution pipeline built on top.
//!
//! # Example
//!
//! ```rust
//! use gospel_store::{CellDef, Store, Var};
//!
//! let store = Store::in_memory().shared();
//!
//! // first pass
//! let count = Var::register(&store, "root", "root", false, CellDef::new(|| 0u32));
//! count.set(1).unwrap();
//!
//! // second pass over the same store lands on the same address
//! store.borrow_mut().flush();
//! let again = Var::register(&store, "root", "root", false, CellDef::new(|| 0u32));
//! assert!(again.is_copy());
//! assert_eq!(again.get(), 1);
//! ```

pub mod address;
mod cell;
mod error;
mod persistent;
mod store;

pub use cell::{CellDef, Generator, Var};
pub use error::{Error, Result};
pub use persistent::{InMemoryStore, PersistentStore};
pub use store::{CallbackFn, CellId, Registration, SharedStore, Store};
