//! The inbound request as seen by render functions.

use std::cell::OnceCell;

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, Method, Uri};

use crate::values::Values;

/// Name of the hidden field that correlates a submitted form with the
/// callback that rendered it.
pub const CORRELATION_FIELD: &str = "_gspl";

/// A buffered HTTP request.
///
/// Form values are parsed on first access and cached.
#[derive(Debug, Default)]
pub struct Request {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    form: OnceCell<Values>,
}

impl Request {
    pub fn from_parts(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            method,
            uri,
            headers,
            body,
            form: OnceCell::new(),
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Request path without the query.
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Parsed query string.
    pub fn query(&self) -> Values {
        self.uri
            .query()
            .map(|query| Values::parse(query.as_bytes()))
            .unwrap_or_default()
    }

    /// True if the media type of the body is `mime`, ignoring parameters.
    pub fn has_content_type(&self, mime: &str) -> bool {
        self.content_type()
            .is_some_and(|value| value.eq_ignore_ascii_case(mime))
    }

    fn content_type(&self) -> Option<&str> {
        let value = self.headers.get(CONTENT_TYPE)?;
        match value.to_str() {
            Ok(value) => value.split(';').next().map(str::trim),
            Err(err) => {
                tracing::warn!("unreadable content type: {}", err);
                None
            }
        }
    }

    /// Submitted form values: the urlencoded body of a `POST`, `PUT` or
    /// `PATCH` request followed by the query values.
    ///
    /// Bodies of other content types are not parsed.
    pub fn form(&self) -> &Values {
        self.form.get_or_init(|| {
            let mut values = self.body_values();
            values.extend(self.query());
            values
        })
    }

    fn body_values(&self) -> Values {
        let has_body = [Method::POST, Method::PUT, Method::PATCH].contains(&self.method);
        if !has_body || self.body.is_empty() {
            return Values::new();
        }

        if self.has_content_type("application/x-www-form-urlencoded") {
            return Values::parse(&self.body);
        }

        if self.has_content_type("multipart/form-data") {
            tracing::warn!(path = %self.path(), "multipart form data is not supported");
        } else {
            tracing::debug!(
                path = %self.path(),
                content_type = ?self.content_type(),
                "body is not form data"
            );
        }
        Values::new()
    }

    /// True for methods that do not change state.
    pub fn is_safe(&self) -> bool {
        self.method == Method::GET || self.method == Method::HEAD
    }
}

impl From<http::Request<Bytes>> for Request {
    fn from(request: http::Request<Bytes>) -> Self {
        let (parts, body) = request.into_parts();
        Self::from_parts(parts.method, parts.uri, parts.headers, body)
    }
}
