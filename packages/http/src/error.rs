use gospel_core::Error as CoreError;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Core error: {0}")]
    Core(#[from] CoreError),

    #[error("HTTP error: {0}")]
    Http(#[from] http::Error),

    #[error("Invalid header value: {0}")]
    InvalidHeaderValue(#[from] http::header::InvalidHeaderValue),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {message}")]
    Config { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
