use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Seven years, in seconds.
const DEFAULT_SESSION_MAX_AGE: u64 = 365 * 24 * 7 * 60 * 60;

/// Request handling configuration.
///
/// Missing fields take their default values, so a config file only needs to
/// name what it changes.
///
/// # Example
///
/// ```rust
/// use gospel_http::ServerConfig;
///
/// let config = ServerConfig::from_json_str(r#"{ "secure_cookie": true }"#).unwrap();
/// assert!(config.secure_cookie);
/// assert_eq!(config.session_cookie, "session-data");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Name of the cookie holding persistent cells.
    pub session_cookie: String,
    pub session_max_age_secs: u64,
    pub secure_cookie: bool,
    pub http_only: bool,
    /// Larger request bodies are dropped before form parsing.
    pub max_form_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            session_cookie: "session-data".to_string(),
            session_max_age_secs: DEFAULT_SESSION_MAX_AGE,
            secure_cookie: false,
            http_only: true,
            max_form_bytes: 10 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: ServerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Check that the cookie name is a valid HTTP token.
    pub fn validate(&self) -> Result<()> {
        let valid = !self.session_cookie.is_empty()
            && self
                .session_cookie
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b));
        if !valid {
            return Err(Error::Config {
                message: format!("invalid session cookie name '{}'", self.session_cookie),
            });
        }
        Ok(())
    }
}
