//! The two-pass execution pipeline.
//!
//! A request runs the root render function twice over one store:
//!
//! 1. interactive pass: callbacks may fire and mutate cells; the tree is
//!    discarded
//! 2. flush: index counters and callbacks are reset, values are kept
//! 3. pure pass: the tree is built again from the mutated state
//! 4. finalize: lazy nodes are materialized, persistent cells are written,
//!    and the outcome is chosen (redirect, then responder, then render)

use bytes::Bytes;
use http::{HeaderMap, StatusCode};

use crate::context::Scope;
use crate::error::Result;
use crate::node::Node;

/// Where a request is in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Created,
    Interactive,
    Flushed,
    Pure,
    Finalized,
}

/// What the request produced.
#[derive(Debug)]
pub enum Outcome {
    /// The pure-pass tree, to be sent as HTML.
    Render {
        status: StatusCode,
        headers: HeaderMap,
        node: Node,
    },
    Redirect {
        location: String,
        headers: HeaderMap,
    },
    /// A response produced by the responder override.
    Respond(http::Response<Bytes>),
}

impl Outcome {
    /// The rendered body, if this is a render outcome.
    pub fn body(&self) -> Option<String> {
        match self {
            Outcome::Render { node, .. } => Some(node.render()),
            _ => None,
        }
    }
}

impl Scope {
    /// Run `root` through both passes and decide the outcome.
    ///
    /// Errors returned by `root` abort the request; nothing is persisted.
    ///
    /// # Example
    ///
    /// ```rust
    /// use gospel_core::node::div;
    /// use gospel_core::{Outcome, Request, Scope};
    /// use gospel_store::Store;
    ///
    /// let scope = Scope::root(Request::default(), Store::in_memory().shared());
    /// let outcome = scope.execute(|_| Ok(div().child("hello").into())).unwrap();
    /// assert_eq!(outcome.body().as_deref(), Some("<div>hello</div>"));
    /// ```
    pub fn execute<F>(&self, root: F) -> Result<Outcome>
    where
        F: Fn(&Scope) -> Result<Node>,
    {
        self.set_phase(Phase::Interactive);
        self.set_interactive(true);
        let result = root(self);
        self.set_interactive(false);
        if let Err(err) = result {
            self.release_callbacks();
            return Err(err);
        }

        self.store().borrow_mut().flush();
        self.set_phase(Phase::Flushed);

        self.set_phase(Phase::Pure);
        let node = match root(self) {
            Ok(node) => node.materialize(),
            Err(err) => {
                self.release_callbacks();
                return Err(err);
            }
        };

        let written = self.store().borrow_mut().finalize();
        self.release_callbacks();
        self.set_phase(Phase::Finalized);
        tracing::debug!(
            path = %self.request().path(),
            persisted = written,
            "request finalized"
        );

        Ok(self.outcome(node))
    }

    /// Callbacks capture cell handles, which point back at the store.
    fn release_callbacks(&self) {
        self.store().borrow_mut().flush();
    }

    fn outcome(&self, node: Node) -> Outcome {
        if let Some(location) = self.redirected_to() {
            let request = self.request();
            if location != request.path() || !request.is_safe() {
                return Outcome::Redirect {
                    location,
                    headers: self.headers(),
                };
            }
            tracing::debug!(%location, "ignoring redirect to the current page");
        }

        if let Some(responder) = self.responder() {
            return Outcome::Respond(responder(self));
        }

        Outcome::Render {
            status: self.status_code(),
            headers: self.headers(),
            node,
        }
    }
}
