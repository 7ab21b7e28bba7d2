//! Components shared by every request, registered once at startup.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::context::Scope;
use crate::error::{Error, Result};
use crate::node::Node;

/// A reusable render function.
pub type Component = Arc<dyn Fn(&Scope) -> Result<Node> + Send + Sync>;

/// Collects components before the registry is frozen.
///
/// # Example
///
/// ```rust
/// use gospel_core::node::{span, Node};
/// use gospel_core::RegistryBuilder;
///
/// let mut builder = RegistryBuilder::new();
/// builder
///     .register("badge", |_| Ok(span().child("new").into()))
///     .unwrap();
/// assert!(builder.register("badge", |_| Ok(Node::Empty)).is_err());
///
/// let registry = builder.build();
/// assert!(registry.contains("badge"));
/// ```
#[derive(Default)]
pub struct RegistryBuilder {
    components: BTreeMap<String, Component>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a component. Names must be unique.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        component: impl Fn(&Scope) -> Result<Node> + Send + Sync + 'static,
    ) -> Result<&mut Self> {
        let name = name.into();
        if self.components.contains_key(&name) {
            return Err(Error::Registry {
                message: format!("component '{}' is already registered", name),
            });
        }
        tracing::debug!(%name, "registered component");
        self.components.insert(name, Arc::new(component));
        Ok(self)
    }

    pub fn build(self) -> Arc<Registry> {
        Arc::new(Registry {
            components: self.components,
        })
    }
}

/// Read-only set of named components.
#[derive(Default)]
pub struct Registry {
    components: BTreeMap<String, Component>,
}

impl Registry {
    pub fn get(&self, name: &str) -> Option<&Component> {
        self.components.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.components.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.components.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
