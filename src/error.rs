use thiserror::Error;

#[derive(Error, Debug)]
pub enum SsrfError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("No response from server. Please check if the backend is running.")]
    NoResponse,

    #[error("{message}")]
    Server { status: u16, message: String },

    #[error("Not authenticated. Run `ssrf portfolio login` first.")]
    Unauthorized,

    #[error("Invalid column mapping: {0}")]
    InvalidMapping(String),

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("{0}")]
    NotSupported(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("Cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, SsrfError>;
