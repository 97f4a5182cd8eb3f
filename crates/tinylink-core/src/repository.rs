use crate::error::StorageError;
use crate::shortcode::ShortCode;
use async_trait::async_trait;
use jiff::Timestamp;

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// A stored mapping from a short code to the original URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ShortLink {
    /// Surrogate key assigned by the store.
    pub id: i64,
    pub short_code: ShortCode,
    /// The original URL that was shortened.
    pub long_url: String,
    /// Set once when the row is inserted.
    pub created_at: Timestamp,
}

/// Outcome of [`Repository::get_or_insert`].
#[derive(Debug, Clone, PartialEq)]
pub enum Upsert {
    /// The long URL was already stored; the candidate code was not used.
    Existing(ShortLink),
    /// A new row was inserted with the candidate code.
    Created(ShortLink),
}

impl Upsert {
    pub fn link(&self) -> &ShortLink {
        match self {
            Upsert::Existing(link) | Upsert::Created(link) => link,
        }
    }

    pub fn into_link(self) -> ShortLink {
        match self {
            Upsert::Existing(link) | Upsert::Created(link) => link,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Upsert::Created(_))
    }
}

/// A read-only view of a repository.
#[async_trait]
pub trait ReadRepository: Send + Sync + 'static {
    /// Retrieves the link stored under a short code.
    /// Returns `None` if the code does not exist.
    async fn find_by_code(&self, code: &ShortCode) -> Result<Option<ShortLink>>;

    /// Retrieves the earliest link stored for a long URL, if any.
    async fn find_by_long_url(&self, long_url: &str) -> Result<Option<ShortLink>>;
}

#[async_trait]
pub trait Repository: ReadRepository {
    /// Returns the link already stored for `long_url`, or inserts a new one
    /// under `code`.
    ///
    /// The lookup and the insert are atomic with respect to other calls for
    /// the same `long_url`. Returns `Err(StorageError::Conflict)` if `code`
    /// is already taken by a different URL.
    async fn get_or_insert(&self, long_url: &str, code: &ShortCode) -> Result<Upsert>;
}
