use thiserror::Error;

#[derive(Debug, Error)]
pub enum PagerError {
    #[error("Malformed identifier: {0}")]
    MalformedIdentifier(String),

    #[error("Invalid limit: {0} (must be a positive integer)")]
    InvalidLimit(i64),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Cursor does not match the configured sort key: {0}")]
    CursorMismatch(String),

    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serde JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl PagerError {
    /// True for failures caused by caller input rather than the store.
    #[must_use]
    pub const fn is_input_error(&self) -> bool {
        matches!(self, Self::MalformedIdentifier(_) | Self::InvalidLimit(_) | Self::CursorMismatch(_))
    }
}
