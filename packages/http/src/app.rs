//! Turning an HTTP request into a response.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE, LOCATION, SET_COOKIE};
use http::{HeaderMap, Response, StatusCode};

use gospel_core::{Node, Outcome, Registry, Request, Scope};
use gospel_router::use_router;
use gospel_store::Store;

use crate::config::ServerConfig;
use crate::error::Result;
use crate::session::CookieStore;

/// The application's root render function.
pub type RootFn = Arc<dyn Fn(&Scope) -> gospel_core::Result<Node> + Send + Sync>;

/// A Gospel application: a root render function plus shared components.
///
/// `App` is cheap to clone and can be shared between worker threads; each
/// call to [`App::handle`] builds its own store and scope.
///
/// # Example
///
/// ```rust
/// use bytes::Bytes;
/// use gospel_core::node::div;
/// use gospel_http::App;
///
/// let app = App::new(|_| Ok(div().child("hello").into()));
/// let request = http::Request::get("/").body(Bytes::new()).unwrap();
///
/// let response = app.handle(request);
/// assert_eq!(response.status(), 200);
/// assert_eq!(&response.body()[..], b"<div>hello</div>");
/// ```
#[derive(Clone)]
pub struct App {
    root: RootFn,
    registry: Arc<Registry>,
    config: Arc<ServerConfig>,
}

impl App {
    pub fn new(root: impl Fn(&Scope) -> gospel_core::Result<Node> + Send + Sync + 'static) -> Self {
        Self {
            root: Arc::new(root),
            registry: Arc::new(Registry::default()),
            config: Arc::new(ServerConfig::default()),
        }
    }

    #[must_use]
    pub fn with_registry(mut self, registry: Arc<Registry>) -> Self {
        self.registry = registry;
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: ServerConfig) -> Self {
        self.config = Arc::new(config);
        self
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Handle a request, answering failures with an error response.
    pub fn handle(&self, request: http::Request<Bytes>) -> Response<Bytes> {
        match self.try_handle(request) {
            Ok(response) => response,
            Err(err) => {
                tracing::error!("cannot build response: {}", err);
                plain(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    reason(StatusCode::INTERNAL_SERVER_ERROR),
                )
            }
        }
    }

    /// Handle a request.
    ///
    /// Errors of the root render function become error responses; only
    /// failures to build the response itself are returned.
    pub fn try_handle(&self, request: http::Request<Bytes>) -> Result<Response<Bytes>> {
        let (parts, body) = request.into_parts();
        let body = if body.len() > self.config.max_form_bytes {
            tracing::warn!(
                path = parts.uri.path(),
                size = body.len(),
                limit = self.config.max_form_bytes,
                "request body too large, ignoring it"
            );
            Bytes::new()
        } else {
            body
        };

        let session = Rc::new(RefCell::new(CookieStore::from_headers(
            &parts.headers,
            &self.config.session_cookie,
        )));
        let store = Store::new(session.clone()).shared();
        let request = Request::from_parts(parts.method, parts.uri, parts.headers, body);
        let scope = Scope::with_registry(request, store, self.registry.clone());
        use_router(&scope);

        let outcome = match scope.execute(|scope| (self.root)(scope)) {
            Ok(outcome) => outcome,
            Err(err) => {
                let status = err.status_code();
                tracing::error!(path = scope.request().path(), %status, "request failed: {}", err);
                let message = match &err {
                    gospel_core::Error::Status { message, .. } => message.clone(),
                    _ => reason(status).to_string(),
                };
                return Ok(plain(status, &message));
            }
        };

        let mut response = respond(outcome)?;
        let cookie = session.borrow().set_cookie(&self.config)?;
        response.headers_mut().append(SET_COOKIE, cookie);
        Ok(response)
    }
}

fn respond(outcome: Outcome) -> Result<Response<Bytes>> {
    match outcome {
        Outcome::Render {
            status,
            headers,
            node,
        } => {
            let mut response = with_headers(Bytes::from(node.render()), status, headers);
            response
                .headers_mut()
                .entry(CONTENT_TYPE)
                .or_insert(HeaderValue::from_static("text/html"));
            Ok(response)
        }
        Outcome::Redirect { location, headers } => {
            let mut response = with_headers(Bytes::new(), StatusCode::FOUND, headers);
            response
                .headers_mut()
                .insert(LOCATION, HeaderValue::from_str(&location)?);
            Ok(response)
        }
        Outcome::Respond(response) => Ok(response),
    }
}

fn with_headers(body: Bytes, status: StatusCode, headers: HeaderMap) -> Response<Bytes> {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    response.headers_mut().extend(headers);
    response
}

fn plain(status: StatusCode, message: &str) -> Response<Bytes> {
    let mut response = Response::new(Bytes::from(message.to_string()));
    *response.status_mut() = status;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

fn reason(status: StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("Error")
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish()
    }
}
