//! Renderable node trees.
//!
//! The tree is deliberately small: elements, text, raw markup, fragments,
//! lazy nodes resolved after the pure pass, and custom nodes implementing
//! [`Render`].

use std::fmt;
use std::rc::Rc;

/// Anything that can write itself as markup.
pub trait Render {
    fn render_to(&self, out: &mut String);

    /// Replacement node produced before rendering, if any.
    fn materialize(&self) -> Option<Node> {
        None
    }
}

/// A node of the output tree.
#[derive(Clone, Default)]
pub enum Node {
    #[default]
    Empty,
    /// Escaped text.
    Text(String),
    /// Markup written verbatim.
    Raw(String),
    Element(Element),
    Fragment(Vec<Node>),
    /// Produced on demand; see [`Node::materialize`].
    Lazy(Rc<dyn Fn() -> Node>),
    Custom(Rc<dyn Render>),
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(text.into())
    }

    pub fn raw(markup: impl Into<String>) -> Self {
        Node::Raw(markup.into())
    }

    pub fn fragment(children: impl IntoIterator<Item = Node>) -> Self {
        Node::Fragment(children.into_iter().collect())
    }

    pub fn lazy(f: impl Fn() -> Node + 'static) -> Self {
        Node::Lazy(Rc::new(f))
    }

    pub fn custom(render: impl Render + 'static) -> Self {
        Node::Custom(Rc::new(render))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Node::Empty)
    }

    /// Resolve every lazy and custom node that produces a replacement.
    pub fn materialize(self) -> Node {
        match self {
            Node::Lazy(f) => f().materialize(),
            Node::Custom(custom) => match custom.materialize() {
                Some(node) => node.materialize(),
                None => Node::Custom(custom),
            },
            Node::Element(mut element) => {
                element.children = element
                    .children
                    .into_iter()
                    .map(Node::materialize)
                    .collect();
                Node::Element(element)
            }
            Node::Fragment(children) => {
                Node::Fragment(children.into_iter().map(Node::materialize).collect())
            }
            other => other,
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_to(&mut out);
        out
    }

    pub fn render_to(&self, out: &mut String) {
        match self {
            Node::Empty => {}
            Node::Text(text) => out.push_str(&escape_html(text)),
            Node::Raw(markup) => out.push_str(markup),
            Node::Element(element) => element.render_to(out),
            Node::Fragment(children) => {
                for child in children {
                    child.render_to(out);
                }
            }
            Node::Lazy(f) => f().render_to(out),
            Node::Custom(custom) => custom.render_to(out),
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Empty => write!(f, "Empty"),
            Node::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Node::Raw(markup) => f.debug_tuple("Raw").field(markup).finish(),
            Node::Element(element) => fmt::Debug::fmt(element, f),
            Node::Fragment(children) => f.debug_tuple("Fragment").field(children).finish(),
            Node::Lazy(_) => write!(f, "Lazy(..)"),
            Node::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

impl From<&str> for Node {
    fn from(text: &str) -> Self {
        Node::Text(text.to_string())
    }
}

impl From<String> for Node {
    fn from(text: String) -> Self {
        Node::Text(text)
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

impl From<Option<Node>> for Node {
    fn from(node: Option<Node>) -> Self {
        node.unwrap_or_default()
    }
}

/// An HTML element.
///
/// # Example
///
/// ```rust
/// use gospel_core::node::{div, Node};
///
/// let node: Node = div().attr("class", "greeting").child("hello").into();
/// assert_eq!(node.render(), r#"<div class="greeting">hello</div>"#);
/// ```
#[derive(Debug, Clone)]
pub struct Element {
    pub tag: String,
    pub attributes: Vec<(String, Option<String>)>,
    pub children: Vec<Node>,
    /// Void elements have no children and no closing tag.
    pub void: bool,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: Vec::new(),
            children: Vec::new(),
            void: false,
        }
    }

    pub fn void(tag: impl Into<String>) -> Self {
        Self {
            void: true,
            ..Self::new(tag)
        }
    }

    /// Set an attribute, replacing an earlier value of the same name.
    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(name.into(), Some(value.into()));
        self
    }

    /// Set a valueless attribute such as `disabled`.
    #[must_use]
    pub fn flag(mut self, name: impl Into<String>) -> Self {
        self.set_attribute(name.into(), None);
        self
    }

    fn set_attribute(&mut self, name: String, value: Option<String>) {
        match self.attributes.iter_mut().find(|(n, _)| *n == name) {
            Some(existing) => existing.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, value)| value.as_deref())
    }

    #[must_use]
    pub fn child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }

    #[must_use]
    pub fn children(mut self, children: impl IntoIterator<Item = Node>) -> Self {
        self.children.extend(children);
        self
    }

    fn render_to(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.tag);
        for (name, value) in &self.attributes {
            out.push(' ');
            out.push_str(name);
            if let Some(value) = value {
                out.push_str("=\"");
                out.push_str(&escape_html(value));
                out.push('"');
            }
        }
        out.push('>');

        if self.void {
            return;
        }

        for child in &self.children {
            child.render_to(out);
        }
        out.push_str("</");
        out.push_str(&self.tag);
        out.push('>');
    }
}

pub fn div() -> Element {
    Element::new("div")
}

pub fn span() -> Element {
    Element::new("span")
}

pub fn p() -> Element {
    Element::new("p")
}

pub fn a(href: impl Into<String>) -> Element {
    Element::new("a").attr("href", href)
}

pub fn button() -> Element {
    Element::new("button")
}

pub fn form() -> Element {
    Element::new("form")
}

pub fn input() -> Element {
    Element::void("input")
}

/// Escape text for element content and attribute values.
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
