//! Session persistence in a single cookie.
//!
//! The cookie value is the base64 encoding of a JSON object mapping cell
//! addresses to their serialized values.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use http::header::{HeaderValue, COOKIE};
use http::HeaderMap;
use serde_json::Value;

use gospel_store::{InMemoryStore, PersistentStore};

use crate::config::ServerConfig;
use crate::error::Result;

/// Persistent store backed by the session cookie.
#[derive(Debug, Default)]
pub struct CookieStore {
    data: InMemoryStore,
    cleared: bool,
}

impl CookieStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a cookie value; undecodable values start an empty session.
    pub fn from_cookie_value(value: &str) -> Self {
        if value.is_empty() {
            return Self::new();
        }

        let decoded = match STANDARD.decode(value) {
            Ok(decoded) => decoded,
            Err(err) => {
                tracing::warn!("ignoring session cookie: {}", err);
                return Self::new();
            }
        };

        match serde_json::from_slice::<BTreeMap<String, Value>>(&decoded) {
            Ok(data) => Self {
                data: InMemoryStore::with_data(data),
                cleared: false,
            },
            Err(err) => {
                tracing::warn!("ignoring session cookie: {}", err);
                Self::new()
            }
        }
    }

    /// The session carried by the `Cookie` headers, if any.
    pub fn from_headers(headers: &HeaderMap, cookie_name: &str) -> Self {
        match find_cookie(headers, cookie_name) {
            Some(value) => Self::from_cookie_value(value),
            None => Self::new(),
        }
    }

    pub fn data(&self) -> &BTreeMap<String, Value> {
        self.data.data()
    }

    /// True once the session was cleared during this request.
    pub fn is_cleared(&self) -> bool {
        self.cleared
    }

    /// The cookie value for the current data.
    pub fn encode(&self) -> Result<String> {
        let json = serde_json::to_vec(self.data.data())?;
        Ok(STANDARD.encode(json))
    }

    /// `Set-Cookie` value writing the session, or expiring it if cleared.
    pub fn set_cookie(&self, config: &ServerConfig) -> Result<HeaderValue> {
        let (value, max_age) = if self.cleared {
            (String::new(), 0)
        } else {
            (self.encode()?, config.session_max_age_secs)
        };

        let mut cookie = format!(
            "{}={}; Path=/; Max-Age={}",
            config.session_cookie, value, max_age
        );
        if config.http_only {
            cookie.push_str("; HttpOnly");
        }
        if config.secure_cookie {
            cookie.push_str("; Secure");
        }
        Ok(HeaderValue::from_str(&cookie)?)
    }
}

impl PersistentStore for CookieStore {
    fn get(&mut self, key: &str) -> gospel_store::Result<Option<Value>> {
        self.data.get(key)
    }

    fn set(&mut self, key: &str, value: Value) -> gospel_store::Result<()> {
        self.data.set(key, value)
    }

    fn clear(&mut self) {
        self.cleared = true;
        self.data.clear();
    }
}

/// Value of the cookie `name` across all `Cookie` headers.
fn find_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"'))
}
