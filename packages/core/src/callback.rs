use std::fmt;
use std::rc::Rc;

use http::Method;

use crate::context::Scope;
use crate::node::{form, input, Node};
use crate::request::CORRELATION_FIELD;

/// Handle to a callback registered through [`Scope::register_callback`].
#[derive(Clone)]
pub struct Callback {
    id: String,
    scope: Scope,
    f: Rc<dyn Fn()>,
}

impl Callback {
    pub(crate) fn new(id: String, scope: Scope, f: Rc<dyn Fn()>) -> Self {
        Self { id, scope, f }
    }

    /// Id of the form `<scope key>.<ordinal>`.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Invoke the callback if the request is in its interactive pass.
    pub fn call(&self) -> bool {
        if !self.scope.interactive() {
            return false;
        }
        (self.f)();
        true
    }

    /// Invoke the callback if the request is a `POST` of the form rendered by
    /// [`Callback::form`].
    pub fn on_submit(&self) -> bool {
        let request = self.scope.request();
        let submitted = request.method() == Method::POST
            && request.form().get(CORRELATION_FIELD) == Some(self.id.as_str());
        submitted && self.call()
    }

    /// A `POST` form that triggers [`Callback::on_submit`] when sent.
    pub fn form(&self, children: impl IntoIterator<Item = Node>) -> Node {
        form()
            .attr("method", "POST")
            .children(children)
            .child(correlation_input(&self.id))
            .into()
    }
}

pub(crate) fn correlation_input(id: &str) -> Node {
    input()
        .attr("type", "hidden")
        .attr("name", CORRELATION_FIELD)
        .attr("value", id)
        .into()
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback").field("id", &self.id).finish()
    }
}
