//! Gospel Router: nested path matching on top of scoped state
//!
//! A request has one [`Router`], stored as the global cell `router` and
//! fetched with [`use_router`]. [`Router::matches`] tries a list of
//! [`Route`]s against the part of the path not yet consumed by enclosing
//! matches and renders only the first one that fits.
//!
//! Only the matched branch runs, so cells and callbacks of sibling routes are
//! never registered.

mod route;
mod router;

pub use route::{Route, Target};
pub use router::{use_router, Frame, Router, ROUTER_KEY};
