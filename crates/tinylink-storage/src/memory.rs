use async_trait::async_trait;
use jiff::Timestamp;
use parking_lot::RwLock;
use std::collections::HashMap;
use tinylink_core::error::StorageError;
use tinylink_core::repository::{ReadRepository, Repository, Result, ShortLink, Upsert};
use tinylink_core::shortcode::ShortCode;

#[derive(Debug, Default)]
struct Tables {
    next_id: i64,
    by_code: HashMap<String, ShortLink>,
    /// long url -> short code of the first row stored for it
    by_long_url: HashMap<String, String>,
}

/// In-memory implementation of the Repository trait.
///
/// Both indexes sit behind one lock so `get_or_insert` observes and updates
/// them atomically. Nothing is persisted.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    tables: RwLock<Tables>,
}

impl InMemoryRepository {
    /// Creates a new in-memory repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new in-memory repository with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            tables: RwLock::new(Tables {
                next_id: 0,
                by_code: HashMap::with_capacity(capacity),
                by_long_url: HashMap::with_capacity(capacity),
            }),
        }
    }

    /// Number of stored links.
    pub fn len(&self) -> usize {
        self.tables.read().by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ReadRepository for InMemoryRepository {
    async fn find_by_code(&self, code: &ShortCode) -> Result<Option<ShortLink>> {
        Ok(self.tables.read().by_code.get(code.as_str()).cloned())
    }

    async fn find_by_long_url(&self, long_url: &str) -> Result<Option<ShortLink>> {
        let tables = self.tables.read();
        Ok(tables
            .by_long_url
            .get(long_url)
            .and_then(|code| tables.by_code.get(code))
            .cloned())
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn get_or_insert(&self, long_url: &str, code: &ShortCode) -> Result<Upsert> {
        let mut tables = self.tables.write();

        if let Some(existing) = tables
            .by_long_url
            .get(long_url)
            .and_then(|code| tables.by_code.get(code))
        {
            return Ok(Upsert::Existing(existing.clone()));
        }

        if tables.by_code.contains_key(code.as_str()) {
            return Err(StorageError::Conflict(code.to_string()));
        }

        tables.next_id += 1;
        let link = ShortLink {
            id: tables.next_id,
            short_code: code.clone(),
            long_url: long_url.to_owned(),
            created_at: Timestamp::now(),
        };
        tables
            .by_long_url
            .insert(long_url.to_owned(), code.as_str().to_owned());
        tables
            .by_code
            .insert(code.as_str().to_owned(), link.clone());

        Ok(Upsert::Created(link))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn code(s: &str) -> ShortCode {
        ShortCode::new_unchecked(s)
    }

    #[tokio::test]
    async fn insert_and_find() {
        let repo = InMemoryRepository::new();

        let upsert = repo
            .get_or_insert("https://example.com", &code("abc123"))
            .await
            .unwrap();
        assert!(upsert.is_created());
        assert_eq!(upsert.link().id, 1);

        let by_code = repo.find_by_code(&code("abc123")).await.unwrap().unwrap();
        assert_eq!(by_code.long_url, "https://example.com");

        let by_url = repo
            .find_by_long_url("https://example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_url.short_code, code("abc123"));
    }

    #[tokio::test]
    async fn find_nonexistent() {
        let repo = InMemoryRepository::new();

        assert!(repo.find_by_code(&code("nope")).await.unwrap().is_none());
        assert!(repo
            .find_by_long_url("https://nope.example")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn existing_url_keeps_its_code() {
        let repo = InMemoryRepository::new();

        repo.get_or_insert("https://example.com", &code("first1"))
            .await
            .unwrap();
        let second = repo
            .get_or_insert("https://example.com", &code("second"))
            .await
            .unwrap();

        assert!(!second.is_created());
        assert_eq!(second.link().short_code, code("first1"));
        assert!(repo.find_by_code(&code("second")).await.unwrap().is_none());
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn code_conflict() {
        let repo = InMemoryRepository::new();

        repo.get_or_insert("https://example.com", &code("abc123"))
            .await
            .unwrap();

        let err = repo
            .get_or_insert("https://other.com", &code("abc123"))
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::Conflict(_)));
        assert!(repo
            .find_by_long_url("https://other.com")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn ids_increase() {
        let repo = InMemoryRepository::with_capacity(4);

        let a = repo.get_or_insert("https://a.com", &code("aaaaaa")).await.unwrap();
        let b = repo.get_or_insert("https://b.com", &code("bbbbbb")).await.unwrap();

        assert!(a.link().id < b.link().id);
        assert!(a.link().created_at <= b.link().created_at);
    }

    #[tokio::test]
    async fn concurrent_inserts_of_same_url_store_one_row() {
        let repo = Arc::new(InMemoryRepository::new());
        let mut handles = vec![];

        for i in 0..16u64 {
            let repo = Arc::clone(&repo);
            handles.push(tokio::spawn(async move {
                let c = ShortCode::new_unchecked(format!("code{:02}", i));
                repo.get_or_insert("https://same.example", &c)
                    .await
                    .unwrap()
                    .into_link()
            }));
        }

        let mut codes = vec![];
        for handle in handles {
            codes.push(handle.await.unwrap().short_code);
        }

        assert_eq!(repo.len(), 1);
        assert!(codes.windows(2).all(|w| w[0] == w[1]));
    }
}
