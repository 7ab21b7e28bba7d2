//! The frame stack and the matching algorithm.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use gospel_core::{Node, Result, Scope, Values};

use crate::route::Route;

/// Global cell address under which the router is stored.
pub const ROUTER_KEY: &str = "router";

/// A route that matched and is being rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Path consumed so far, below the router prefix.
    pub path: String,
    /// Capture groups of the match.
    pub captures: Vec<String>,
    /// Pattern of the matched route.
    pub route: String,
}

#[derive(Default)]
struct State {
    prefix: String,
    frames: Vec<Frame>,
}

/// Nested router for one request.
///
/// Each successful [`Router::matches`] pushes a frame for the duration of its
/// target, so nested `matches` calls inside the target only see the part of
/// the path their parents have not consumed.
///
/// The router does not hold on to a scope; operations that need the request
/// or produce a redirect take one.
#[derive(Clone, Default)]
pub struct Router {
    state: Rc<RefCell<State>>,
}

/// The request's router, installed as the global cell `router` on first use.
pub fn use_router(scope: &Scope) -> Router {
    scope.global_local(ROUTER_KEY, Router::new()).get()
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render the first route matching the unconsumed path.
    ///
    /// The target runs in the child scope `route.<pattern>`. Routes with a
    /// configuration error are logged and skipped. If nothing matches, the
    /// result is an empty node. Errors of the target are returned as is.
    ///
    /// # Example
    ///
    /// ```rust
    /// use gospel_core::{Node, Request, Scope};
    /// use gospel_router::{use_router, Route};
    /// use gospel_store::Store;
    ///
    /// let request = http::Request::builder()
    ///     .uri("/a/b")
    ///     .body(bytes::Bytes::new())
    ///     .unwrap();
    /// let scope = Scope::root(Request::from(request), Store::in_memory().shared());
    ///
    /// let node = use_router(&scope)
    ///     .matches(
    ///         &scope,
    ///         &[Route::new("/a", |scope| {
    ///             use_router(scope).matches(
    ///                 scope,
    ///                 &[Route::new("/b", |scope| {
    ///                     Ok(Node::text(use_router(scope).current_path()))
    ///                 })],
    ///             )
    ///         })],
    ///     )
    ///     .unwrap();
    /// assert_eq!(node.render(), "/a/b");
    /// ```
    pub fn matches(&self, scope: &Scope, routes: &[Route]) -> Result<Node> {
        let full = scope.request().path();
        let (consumed, remaining) = {
            let state = self.state.borrow();
            let consumed = state
                .frames
                .last()
                .map(|frame| frame.path.clone())
                .unwrap_or_default();
            let remaining = full
                .strip_prefix(state.prefix.as_str())
                .and_then(|rest| rest.strip_prefix(consumed.as_str()));
            (consumed, remaining)
        };

        let Some(remaining) = remaining else {
            tracing::debug!(path = full, "path is outside the router prefix");
            return Ok(Node::Empty);
        };

        for route in routes {
            if let Some(err) = route.config_error() {
                tracing::warn!(route = route.pattern(), "skipping route: {}", err);
                continue;
            }

            let Some((matched, captures)) = route.find(remaining) else {
                continue;
            };

            let frame = Frame {
                path: format!("{}{}", consumed, matched),
                captures,
                route: route.pattern().to_string(),
            };
            tracing::debug!(route = route.pattern(), path = %frame.path, "route matched");

            let key = format!("route.{}", route.pattern());
            let captures = frame.captures.clone();
            return scope.enter(key, |child| {
                self.push_route(frame);
                let result = route.target().invoke(child, &captures);
                self.pop_route();
                result
            });
        }

        Ok(Node::Empty)
    }

    pub fn push_route(&self, frame: Frame) {
        self.state.borrow_mut().frames.push(frame);
    }

    pub fn pop_route(&self) -> Option<Frame> {
        self.state.borrow_mut().frames.pop()
    }

    /// Number of frames on the stack.
    pub fn depth(&self) -> usize {
        self.state.borrow().frames.len()
    }

    pub fn current_frame(&self) -> Option<Frame> {
        self.state.borrow().frames.last().cloned()
    }

    /// Path consumed by the innermost match, empty outside any match.
    pub fn current_path(&self) -> String {
        self.current_frame()
            .map(|frame| frame.path)
            .unwrap_or_default()
    }

    /// Path consumed by the frame below the innermost one.
    pub fn last_path(&self) -> String {
        let state = self.state.borrow();
        let frames = &state.frames;
        if frames.len() < 2 {
            return String::new();
        }
        frames[frames.len() - 2].path.clone()
    }

    pub fn prefix(&self) -> String {
        self.state.borrow().prefix.clone()
    }

    /// Mount the router below `prefix`; paths outside it never match.
    pub fn set_prefix(&self, prefix: impl Into<String>) {
        self.state.borrow_mut().prefix = prefix.into();
    }

    /// `path` below the router prefix.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.state.borrow().prefix, path)
    }

    /// Redirect to `path` below the router prefix.
    pub fn redirect_to(&self, scope: &Scope, path: &str) {
        scope.redirect_to(self.url(path));
    }

    /// Redirect to the parent match, if there is one.
    pub fn redirect_up(&self, scope: &Scope) {
        let last = self.last_path();
        if !last.is_empty() {
            self.redirect_to(scope, &last);
        }
    }

    /// Redirect to the path recorded `n` frames below the top.
    ///
    /// Does nothing if the stack is not deeper than `n`.
    pub fn redirect_up_by(&self, scope: &Scope, n: usize) {
        let path = {
            let state = self.state.borrow();
            let frames = &state.frames;
            if n >= frames.len() {
                return;
            }
            frames[frames.len() - 1 - n].path.clone()
        };
        self.redirect_to(scope, &path);
    }

    /// The full request path.
    pub fn full_path<'a>(&self, scope: &'a Scope) -> &'a str {
        scope.request().path()
    }

    pub fn query(&self, scope: &Scope) -> Values {
        scope.request().query()
    }

    /// Current path followed by the request query, if any.
    pub fn current_path_with_query(&self, scope: &Scope) -> String {
        if self.depth() == 0 {
            return String::new();
        }
        path_with_query(&self.current_path(), &self.query(scope))
    }

    /// Current path with the query changed by `updates`.
    ///
    /// `None` removes a key, `Some` replaces its values.
    pub fn update_query<I, K>(&self, scope: &Scope, updates: I) -> String
    where
        I: IntoIterator<Item = (K, Option<Vec<String>>)>,
        K: Into<String>,
    {
        if self.depth() == 0 {
            return String::new();
        }

        let mut query = self.query(scope);
        for (key, values) in updates {
            let key = key.into();
            match values {
                Some(values) => query.set(key, values),
                None => {
                    query.remove(&key);
                }
            }
        }
        path_with_query(&self.current_path(), &query)
    }
}

fn path_with_query(path: &str, query: &Values) -> String {
    if query.is_empty() {
        return path.to_string();
    }
    format!("{}?{}", path, query.encode())
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Router")
            .field("prefix", &state.prefix)
            .field("frames", &state.frames)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gospel_core::Request;
    use gospel_store::Store;

    fn scope(uri: &str) -> Scope {
        let request = http::Request::builder()
            .uri(uri)
            .body(bytes::Bytes::new())
            .unwrap();
        Scope::root(Request::from(request), Store::in_memory().shared())
    }

    fn frame(path: &str) -> Frame {
        Frame {
            path: path.to_string(),
            captures: Vec::new(),
            route: path.to_string(),
        }
    }

    #[test]
    fn router_is_a_global_singleton() {
        let scope = scope("/");
        let router = use_router(&scope);
        router.set_prefix("/app");
        assert_eq!(use_router(&scope.child("deep")).prefix(), "/app");
    }

    #[test]
    fn stack_accessors() {
        let router = Router::new();
        assert_eq!(router.current_path(), "");
        assert_eq!(router.last_path(), "");

        router.push_route(frame("/a"));
        router.push_route(frame("/a/b"));
        assert_eq!(router.depth(), 2);
        assert_eq!(router.current_path(), "/a/b");
        assert_eq!(router.last_path(), "/a");

        assert_eq!(router.pop_route().unwrap().path, "/a/b");
        assert_eq!(router.current_path(), "/a");
    }

    #[test]
    fn redirect_up_by_walks_the_stack() {
        let scope = scope("/a/b/c");
        let router = Router::new();
        router.set_prefix("/app");
        for path in ["/a", "/a/b", "/a/b/c"] {
            router.push_route(frame(path));
        }

        router.redirect_up_by(&scope, 3);
        assert_eq!(scope.redirected_to(), None);

        router.redirect_up_by(&scope, 2);
        assert_eq!(scope.redirected_to().as_deref(), Some("/app/a"));

        router.redirect_up(&scope);
        assert_eq!(scope.redirected_to().as_deref(), Some("/app/a/b"));
    }

    #[test]
    fn query_helpers() {
        let scope = scope("/list?page=2&sort=name");
        let router = Router::new();
        assert_eq!(router.current_path_with_query(&scope), "");

        router.push_route(frame("/list"));
        assert_eq!(
            router.current_path_with_query(&scope),
            "/list?page=2&sort=name"
        );
        assert_eq!(
            router.update_query(
                &scope,
                [("page", Some(vec!["3".to_string()])), ("sort", None)]
            ),
            "/list?page=3"
        );
        assert_eq!(
            router.update_query(&scope, [("page", None), ("sort", None)]),
            "/list"
        );
        assert_eq!(router.full_path(&scope), "/list");
    }

    #[test]
    fn prefix_is_consumed() {
        let scope = scope("/app/users");
        let router = use_router(&scope);
        router.set_prefix("/app");

        let node = router
            .matches(&scope, &[Route::new("/users", |s| {
                Ok(Node::text(use_router(s).url("/x")))
            })])
            .unwrap();
        assert_eq!(node.render(), "/app/x");

        let outside = Scope::root(Request::default(), Store::in_memory().shared());
        let router = use_router(&outside);
        router.set_prefix("/app");
        assert!(router
            .matches(&outside, &[Route::node("", "any")])
            .unwrap()
            .is_empty());
    }
}
