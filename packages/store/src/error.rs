//! Error types for the store layer.

/// Errors raised by the [`Store`](crate::Store) and the cells it holds.
///
/// All of these are recoverable: callers decide whether a miss or a failed
/// conversion is worth more than a log line.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// No cell or callback is registered at the address.
    #[error("nothing registered at '{address}'")]
    NotFound { address: String },

    /// The value does not match the type the cell was declared with.
    #[error("type mismatch at '{address}': expected {expected}, found {found}")]
    TypeMismatch {
        address: String,
        expected: &'static str,
        found: String,
    },

    /// The cell holds a value without a serialization bridge.
    #[error("cell at '{address}' cannot be converted to or from JSON")]
    Unsupported { address: String },

    /// JSON (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The persistent store could not read or write a value.
    #[error("persistence error for '{key}': {message}")]
    Persistence { key: String, message: String },
}

impl Error {
    /// True for address misses.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    pub(crate) fn not_found(address: impl Into<String>) -> Self {
        Error::NotFound {
            address: address.into(),
        }
    }
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display() {
        let e = Error::not_found("root.list.3");
        assert!(e.is_not_found());
        assert!(format!("{}", e).contains("root.list.3"));
    }

    #[test]
    fn type_mismatch_display() {
        let e = Error::TypeMismatch {
            address: "root.0".to_string(),
            expected: "i64",
            found: "alloc::string::String".to_string(),
        };
        let display = format!("{}", e);
        assert!(display.contains("root.0"));
        assert!(display.contains("i64"));
        assert!(!e.is_not_found());
    }

    #[test]
    fn json_error_conversion() {
        let json_err = serde_json::from_str::<i64>("nope").unwrap_err();
        let e: Error = json_err.into();
        assert!(matches!(e, Error::Json(_)));
    }
}
