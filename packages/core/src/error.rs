use http::StatusCode;

use gospel_store::Error as StoreError;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Route '{route}': {message}")]
    Route { route: String, message: String },

    #[error("{status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("Render error: {message}")]
    Render { message: String },

    #[error("Registry error: {message}")]
    Registry { message: String },

    #[error("Pool error: {message}")]
    Pool { message: String },
}

impl Error {
    /// An error that should reach the client with the given status.
    pub fn status(status: StatusCode, message: impl Into<String>) -> Self {
        Error::Status {
            status,
            message: message.into(),
        }
    }

    pub fn render(message: impl Into<String>) -> Self {
        Error::Render {
            message: message.into(),
        }
    }

    pub fn route(route: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Route {
            route: route.into(),
            message: message.into(),
        }
    }

    /// Status code of the failure response for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Status { status, .. } => *status,
            Error::Store(err) if err.is_not_found() => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        assert_eq!(
            Error::status(StatusCode::FORBIDDEN, "no").status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            Error::render("boom").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        let missing = Error::from(StoreError::NotFound {
            address: "x".to_string(),
        });
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn display() {
        let err = Error::route("/a(", "cannot compile");
        assert_eq!(err.to_string(), "Route '/a(': cannot compile");
    }
}
