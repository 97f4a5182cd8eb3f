use crate::repository::{ShortLink, Upsert};
use crate::shortcode::ShortCode;
use async_trait::async_trait;

type Result<T> = std::result::Result<T, crate::error::ShortenerError>;

#[async_trait]
pub trait Shortener: Send + Sync + 'static {
    /// Returns the link for `long_url`, creating one with a fresh short code
    /// if the URL has not been shortened before.
    async fn shorten(&self, long_url: &str) -> Result<Upsert>;

    /// Resolves a short code to its stored link.
    /// Returns `None` if the code does not exist.
    async fn resolve(&self, code: &ShortCode) -> Result<Option<ShortLink>>;
}
