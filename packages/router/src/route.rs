//! Route definitions: a pattern and the target it renders.

use std::fmt;
use std::rc::Rc;

use regex::Regex;

use gospel_core::{Node, Result, Scope};

/// What a matched route renders.
///
/// The shape is fixed when the route is declared; captures are only passed
/// to targets that asked for them.
#[derive(Clone)]
pub enum Target {
    NoArgs(Rc<dyn Fn(&Scope) -> Result<Node>>),
    WithCaptures {
        arity: usize,
        f: Rc<dyn Fn(&Scope, &[String]) -> Result<Node>>,
    },
    Static(Node),
}

impl Target {
    pub(crate) fn invoke(&self, scope: &Scope, captures: &[String]) -> Result<Node> {
        match self {
            Target::NoArgs(f) => f(scope),
            Target::WithCaptures { f, .. } => f(scope, captures),
            Target::Static(node) => Ok(node.clone()),
        }
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::NoArgs(_) => write!(f, "NoArgs"),
            Target::WithCaptures { arity, .. } => write!(f, "WithCaptures({})", arity),
            Target::Static(node) => f.debug_tuple("Static").field(node).finish(),
        }
    }
}

/// A path pattern and its target.
///
/// Patterns are regular expressions anchored at the start of the remaining
/// path. A pattern that does not compile, or whose capture groups do not
/// fit the target, makes the route inert: it is logged and skipped whenever
/// the router tries it.
///
/// # Example
///
/// ```rust
/// use gospel_core::Node;
/// use gospel_router::Route;
///
/// let user = Route::captures1("/users/(\\d+)", |_, id| Ok(Node::text(id.to_string())));
/// assert!(user.config_error().is_none());
///
/// let broken = Route::captures2("/users/(\\d+)", |_, _, _| Ok(Node::Empty));
/// assert!(broken.config_error().is_some());
/// ```
#[derive(Debug, Clone)]
pub struct Route {
    pattern: String,
    regex: Option<Regex>,
    target: Target,
    error: Option<String>,
}

impl Route {
    /// A route whose target only takes the scope.
    pub fn new(pattern: impl Into<String>, f: impl Fn(&Scope) -> Result<Node> + 'static) -> Self {
        Self::build(pattern.into(), Target::NoArgs(Rc::new(f)))
    }

    /// A route whose target takes one string per capture group.
    pub fn with_captures(
        pattern: impl Into<String>,
        arity: usize,
        f: impl Fn(&Scope, &[String]) -> Result<Node> + 'static,
    ) -> Self {
        Self::build(
            pattern.into(),
            Target::WithCaptures {
                arity,
                f: Rc::new(f),
            },
        )
    }

    pub fn captures1(
        pattern: impl Into<String>,
        f: impl Fn(&Scope, &str) -> Result<Node> + 'static,
    ) -> Self {
        Self::with_captures(pattern, 1, move |scope, captures| f(scope, &captures[0]))
    }

    pub fn captures2(
        pattern: impl Into<String>,
        f: impl Fn(&Scope, &str, &str) -> Result<Node> + 'static,
    ) -> Self {
        Self::with_captures(pattern, 2, move |scope, captures| {
            f(scope, &captures[0], &captures[1])
        })
    }

    /// A route that always renders `node`.
    pub fn node(pattern: impl Into<String>, node: impl Into<Node>) -> Self {
        Self::build(pattern.into(), Target::Static(node.into()))
    }

    fn build(pattern: String, target: Target) -> Self {
        let anchored = if pattern.starts_with('^') {
            pattern.clone()
        } else {
            format!("^{}", pattern)
        };

        let (regex, error) = match Regex::new(&anchored) {
            Ok(regex) => {
                let groups = regex.captures_len() - 1;
                let error = match &target {
                    Target::WithCaptures { arity, .. } if *arity != groups => Some(format!(
                        "target takes {} captures but the pattern has {} groups",
                        arity, groups
                    )),
                    _ => None,
                };
                (Some(regex), error)
            }
            Err(err) => (None, Some(format!("cannot compile pattern: {}", err))),
        };

        Self {
            pattern,
            regex,
            target,
            error,
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Why the route can never match, if it cannot.
    pub fn config_error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Match `path`, returning the matched prefix and the capture groups.
    ///
    /// Groups that did not participate in the match are empty strings.
    pub(crate) fn find(&self, path: &str) -> Option<(String, Vec<String>)> {
        let captures = self.regex.as_ref()?.captures(path)?;
        let matched = captures.get(0)?.as_str().to_string();
        let groups = captures
            .iter()
            .skip(1)
            .map(|group| group.map_or("", |m| m.as_str()).to_string())
            .collect();
        Some((matched, groups))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patterns_are_anchored() {
        let route = Route::node("/b", "b");
        assert!(route.find("/a/b").is_none());
        assert_eq!(route.find("/b/c").unwrap().0, "/b");

        let explicit = Route::node("^/a$", "a");
        assert!(explicit.find("/a/b").is_none());
        assert!(explicit.find("/a").is_some());
    }

    #[test]
    fn captures_are_collected() {
        let route = Route::captures2("/(\\w+)/(\\d+)?", |_, _, _| Ok(Node::Empty));
        assert!(route.config_error().is_none());

        let (matched, groups) = route.find("/posts/12/edit").unwrap();
        assert_eq!(matched, "/posts/12");
        assert_eq!(groups, vec!["posts", "12"]);

        let (_, groups) = route.find("/posts/").unwrap();
        assert_eq!(groups, vec!["posts", ""]);
    }

    #[test]
    fn bad_patterns_are_inert() {
        let route = Route::new("/(unclosed", |_| Ok(Node::Empty));
        assert!(route.config_error().unwrap().contains("cannot compile"));
        assert!(route.find("/(unclosed").is_none());
    }

    #[test]
    fn arity_mismatch_is_reported() {
        let route = Route::captures1("/static", |_, _| Ok(Node::Empty));
        assert!(route
            .config_error()
            .unwrap()
            .contains("takes 1 captures but the pattern has 0 groups"));
    }

    #[test]
    fn empty_pattern_matches_everything() {
        let route = Route::node("", "any");
        assert_eq!(route.find("/x").unwrap().0, "");
    }
}
