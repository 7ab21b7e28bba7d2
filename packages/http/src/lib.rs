//! # gospel-http
//!
//! HTTP adapter for Gospel.
//!
//! [`App::handle`] takes a buffered `http::Request<Bytes>` and returns the
//! response. For every request it:
//!
//! 1. restores the session from the session cookie ([`CookieStore`])
//! 2. builds the store and root scope and installs the router
//! 3. runs the two-pass pipeline with the application's root function
//! 4. writes the session cookie and shapes the response: rendered HTML, a
//!    `302` redirect, a custom response, or an error response
//!
//! Serving sockets is left to the embedding server; `App` is `Send + Sync`
//! and can be called from any number of worker threads.
//!
//! ## Configuration
//!
//! ```rust
//! use gospel_core::Node;
//! use gospel_http::{App, ServerConfig};
//!
//! let config = ServerConfig {
//!     session_cookie: "sid".to_string(),
//!     ..ServerConfig::default()
//! };
//! let app = App::new(|_| Ok(Node::Empty)).with_config(config);
//! assert_eq!(app.config().session_cookie, "sid");
//! ```

mod app;
mod config;
mod error;
mod session;

pub use app::{App, RootFn};
pub use config::ServerConfig;
pub use error::{Error, Result};
pub use session::CookieStore;
