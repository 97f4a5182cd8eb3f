use async_trait::async_trait;
use std::sync::Arc;
use tinylink_core::{
    ReadRepository, Repository, ShortCode, ShortLink, Shortener, ShortenerError, StorageError,
    Upsert,
};
use tinylink_generator::Generator;
use tracing::{debug, info, trace, warn};

/// Generated codes tried per request before giving up.
pub const DEFAULT_MAX_ATTEMPTS: usize = 5;

/// A concrete implementation of the `Shortener` trait.
///
/// This service wraps a `Repository` and a `Generator` to handle:
/// - reusing the code already stored for a long URL
/// - drawing a fresh code, retrying when it collides with an existing one
#[derive(Debug, Clone)]
pub struct ShortenerService<R, G> {
    repository: Arc<R>,
    generator: Arc<G>,
    max_attempts: usize,
}

impl<R: Repository, G: Generator> ShortenerService<R, G> {
    pub fn new(repository: R, generator: G) -> Self {
        Self::from_shared(Arc::new(repository), generator)
    }

    /// Creates a service over a repository that is also used elsewhere.
    pub fn from_shared(repository: Arc<R>, generator: G) -> Self {
        Self {
            repository,
            generator: Arc::new(generator),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Sets how many generated codes are tried per request. At least one
    /// attempt is always made.
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }
}

#[async_trait]
impl<R: Repository, G: Generator> Shortener for ShortenerService<R, G> {
    async fn shorten(&self, long_url: &str) -> Result<Upsert, ShortenerError> {
        if long_url.is_empty() {
            return Err(ShortenerError::EmptyUrl);
        }

        // Repeats are the common case; skip the write path for them.
        if let Some(existing) = self.repository.find_by_long_url(long_url).await? {
            debug!(code = %existing.short_code, "long url already shortened");
            return Ok(Upsert::Existing(existing));
        }

        for attempt in 1..=self.max_attempts {
            let candidate = self.generator.generate();

            match self.repository.get_or_insert(long_url, &candidate).await {
                Ok(upsert) => {
                    if upsert.is_created() {
                        info!(code = %candidate, attempt, "created short link");
                    }
                    return Ok(upsert);
                }
                Err(StorageError::Conflict(code)) => {
                    warn!(%code, attempt, "generated short code collided, retrying");
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(ShortenerError::CodeSpaceExhausted {
            attempts: self.max_attempts,
        })
    }

    async fn resolve(&self, code: &ShortCode) -> Result<Option<ShortLink>, ShortenerError> {
        trace!(%code, "resolving short code");
        Ok(self.repository.find_by_code(code).await?)
    }
}
