//! These tests start a PostgreSQL container and need a running Docker daemon.
//! Run them with `cargo test -p tinylink-storage -- --ignored`.

use std::sync::Arc;
use std::time::Duration;

use tinylink_core::{ShortCode, Upsert};
use tinylink_storage::{
    PgSslMode, PostgresConfig, PostgresRepository, ReadRepository, Repository, StorageError,
};
use tinylink_test_infra::postgres::{PostgresConfig as ContainerConfig, PostgresServer};

struct Fixture {
    _postgres: PostgresServer,
    repo: PostgresRepository,
}

impl Fixture {
    async fn start() -> Self {
        let postgres = PostgresServer::new(ContainerConfig::builder().build())
            .await
            .expect("start postgres");

        let config = PostgresConfig::builder()
            .host(postgres.host().await.expect("postgres host"))
            .port(postgres.port().await.expect("postgres port"))
            .username(postgres.username())
            .password(postgres.password())
            .database(postgres.database())
            .ssl_mode(PgSslMode::Disable)
            .max_connections(8)
            .build();

        let repo = connect_with_retry(&config).await;
        repo.ensure_schema().await.expect("create schema");

        Self {
            _postgres: postgres,
            repo,
        }
    }
}

async fn connect_with_retry(config: &PostgresConfig) -> PostgresRepository {
    let mut last_error = None;

    for _ in 0..20 {
        match PostgresRepository::connect(config).await {
            Ok(repo) => return repo,
            Err(err) => {
                last_error = Some(err);
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
        }
    }

    panic!("failed to connect postgres: {last_error:?}");
}

fn code(value: &str) -> ShortCode {
    ShortCode::new_unchecked(value)
}

#[tokio::test]
#[ignore = "requires docker"]
async fn insert_and_find_by_code() {
    let fixture = Fixture::start().await;

    let upsert = fixture
        .repo
        .get_or_insert("https://example.com", &code("abc123"))
        .await
        .unwrap();
    assert!(upsert.is_created());

    let got = fixture
        .repo
        .find_by_code(&code("abc123"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(got.long_url, "https://example.com");
    assert_eq!(got, upsert.into_link());
}

#[tokio::test]
#[ignore = "requires docker"]
async fn ensure_schema_is_idempotent() {
    let fixture = Fixture::start().await;

    fixture.repo.ensure_schema().await.unwrap();
    fixture.repo.ensure_schema().await.unwrap();
}

#[tokio::test]
#[ignore = "requires docker"]
async fn existing_long_url_returns_existing_row() {
    let fixture = Fixture::start().await;

    fixture
        .repo
        .get_or_insert("https://example.com", &code("first1"))
        .await
        .unwrap();

    let second = fixture
        .repo
        .get_or_insert("https://example.com", &code("second"))
        .await
        .unwrap();

    match second {
        Upsert::Existing(link) => assert_eq!(link.short_code, code("first1")),
        Upsert::Created(_) => panic!("expected the existing row"),
    }
    assert!(fixture
        .repo
        .find_by_code(&code("second"))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
#[ignore = "requires docker"]
async fn insert_conflicts_when_code_already_exists() {
    let fixture = Fixture::start().await;

    fixture
        .repo
        .get_or_insert("https://one.example", &code("abc123"))
        .await
        .unwrap();

    let err = fixture
        .repo
        .get_or_insert("https://two.example", &code("abc123"))
        .await
        .unwrap_err();

    assert!(matches!(err, StorageError::Conflict(_)));
    assert!(fixture
        .repo
        .find_by_long_url("https://two.example")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
#[ignore = "requires docker"]
async fn very_long_urls_are_stored() {
    let fixture = Fixture::start().await;
    let long_url = format!("https://example.com/?q={}", "x".repeat(10_000));

    fixture
        .repo
        .get_or_insert(&long_url, &code("big123"))
        .await
        .unwrap();

    let got = fixture
        .repo
        .find_by_long_url(&long_url)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(got.short_code, code("big123"));
}

#[tokio::test]
#[ignore = "requires docker"]
async fn concurrent_inserts_of_same_url_store_one_row() {
    let fixture = Fixture::start().await;
    let repo = Arc::new(fixture.repo.clone());
    let mut handles = vec![];

    for i in 0..8u32 {
        let repo = Arc::clone(&repo);
        handles.push(tokio::spawn(async move {
            repo.get_or_insert("https://race.example", &code(&format!("race{i:02}")))
                .await
                .unwrap()
        }));
    }

    let mut created = 0;
    for handle in handles {
        if handle.await.unwrap().is_created() {
            created += 1;
        }
    }
    assert_eq!(created, 1);

    let (rows,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM urls WHERE long_url = $1")
        .bind("https://race.example")
        .fetch_one(repo.pool())
        .await
        .unwrap();
    assert_eq!(rows, 1);
}
