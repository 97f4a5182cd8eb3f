use thiserror::Error;

/// Errors related to the core domain types.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    #[error("invalid short code: {0}")]
    InvalidShortCode(String),
}

/// Errors raised by repository backends.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("short code already exists: {0}")]
    Conflict(String),
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage operation timed out: {0}")]
    Timeout(String),
    #[error("storage query failed: {0}")]
    Query(String),
    #[error("stored data is invalid: {0}")]
    InvalidData(String),
}

#[derive(Debug, Clone, Error)]
pub enum ShortenerError {
    #[error("long url is required")]
    EmptyUrl,
    #[error("no free short code after {attempts} attempts")]
    CodeSpaceExhausted { attempts: usize },
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}
