//! Forms bound to named cells.

use http::Method;

use gospel_store::Var;

use crate::callback::correlation_input;
use crate::context::Scope;
use crate::error::Result;
use crate::node::{form, Node};
use crate::request::CORRELATION_FIELD;
use crate::values::Values;

/// A form identified by `id`.
///
/// Submitted values are only visible when the request carries the form's
/// correlation id, so several forms on one page do not see each other's
/// fields.
///
/// # Example
///
/// ```rust
/// use gospel_core::{Request, Scope};
/// use gospel_store::Store;
/// use http::Method;
///
/// let scope = Scope::root(Request::default(), Store::in_memory().shared());
/// let login = scope.form_data("login", Method::POST);
/// let user = login.var("user", "guest").unwrap();
/// assert_eq!(user.get(), "guest");
/// ```
#[derive(Debug, Clone)]
pub struct FormData {
    scope: Scope,
    id: String,
    method: Method,
    data: Values,
}

impl Scope {
    /// Form data for the form `id`, submitted with `method`.
    pub fn form_data(&self, id: impl Into<String>, method: Method) -> FormData {
        let id = id.into();
        let submitted = self.request().form();
        let data = if submitted.get(CORRELATION_FIELD) == Some(id.as_str()) {
            submitted.clone()
        } else {
            Values::new()
        };

        FormData {
            scope: self.clone(),
            id,
            method,
            data,
        }
    }
}

impl FormData {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Submitted values, empty unless this form was sent.
    pub fn data(&self) -> &Values {
        &self.data
    }

    /// Named cell for the field `name`, set to the submitted value if any.
    pub fn var(&self, name: &str, default: impl Into<String>) -> Result<Var<String>> {
        let var = self.scope.named_var(name, default.into())?;
        if let Some(value) = self.data.get(name) {
            var.set(value.to_string())?;
        }
        Ok(var)
    }

    /// True if the request submitted this form.
    pub fn submitted(&self) -> bool {
        self.scope.request().method() == self.method
            && self.data.get(CORRELATION_FIELD) == Some(self.id.as_str())
    }

    /// Run `f` if this form was submitted, during the interactive pass only.
    pub fn on_submit(&self, f: impl FnOnce()) -> bool {
        if !self.submitted() || !self.scope.interactive() {
            return false;
        }
        f();
        true
    }

    /// The form element, carrying the correlation field.
    pub fn form(&self, children: impl IntoIterator<Item = Node>) -> Node {
        form()
            .attr("method", self.method.as_str())
            .children(children)
            .child(correlation_input(&self.id))
            .into()
    }
}
