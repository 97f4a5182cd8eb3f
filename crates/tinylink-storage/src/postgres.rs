use async_trait::async_trait;
use jiff::Timestamp;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tinylink_core::error::StorageError;
use tinylink_core::repository::{ReadRepository, Repository, Result, ShortLink, Upsert};
use tinylink_core::shortcode::ShortCode;
use tracing::{debug, info};
use typed_builder::TypedBuilder;

pub use sqlx::postgres::PgSslMode;

const SCHEMA: &str = include_str!("../ddl/postgres/urls.sql");

/// Connection settings for [`PostgresRepository::connect`].
#[derive(Debug, Clone, TypedBuilder)]
pub struct PostgresConfig {
    #[builder(default = "localhost".to_string(), setter(into))]
    pub host: String,
    #[builder(default = 5432)]
    pub port: u16,
    #[builder(setter(into))]
    pub username: String,
    #[builder(default, setter(strip_option, into))]
    pub password: Option<String>,
    #[builder(setter(into))]
    pub database: String,
    #[builder(default = PgSslMode::Prefer)]
    pub ssl_mode: PgSslMode,
    #[builder(default = 10)]
    pub max_connections: u32,
}

impl PostgresConfig {
    fn connect_options(&self) -> PgConnectOptions {
        let options = PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.username)
            .database(&self.database)
            .ssl_mode(self.ssl_mode);

        match &self.password {
            Some(password) => options.password(password),
            None => options,
        }
    }
}

/// PostgreSQL implementation of the repository contract, backed by the
/// `urls` table.
///
/// `get_or_insert` runs in a transaction holding an advisory lock keyed on
/// the long URL, so concurrent requests for the same URL observe each
/// other's inserts instead of creating duplicate rows.
#[derive(Debug, Clone)]
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a repository from an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool using `config`.
    ///
    /// The pool connects eagerly so an unreachable database is reported here
    /// rather than on the first request.
    pub async fn connect(config: &PostgresConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(config.connect_options())
            .await
            .map_err(map_sqlx_error)?;

        info!(
            host = %config.host,
            port = config.port,
            database = %config.database,
            "connected to postgres"
        );
        Ok(Self::new(pool))
    }

    /// Creates the `urls` table and its lookup index if they do not exist.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        info!("table 'urls' has been checked/created");
        Ok(())
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn link_from_row(row: &PgRow) -> Result<ShortLink> {
    let id: i64 = row.try_get("id").map_err(map_sqlx_error)?;
    let short_code: String = row.try_get("short_code").map_err(map_sqlx_error)?;
    let long_url: String = row.try_get("long_url").map_err(map_sqlx_error)?;
    let created_at_us: Option<i64> = row.try_get("created_at_us").map_err(map_sqlx_error)?;

    let created_at_us = created_at_us
        .ok_or_else(|| StorageError::InvalidData(format!("row {id} has no created_at")))?;
    let created_at = Timestamp::from_microsecond(created_at_us).map_err(|e| {
        StorageError::InvalidData(format!(
            "invalid created_at timestamp '{}': {e}",
            created_at_us
        ))
    })?;

    Ok(ShortLink {
        id,
        short_code: ShortCode::new_unchecked(short_code),
        long_url,
        created_at,
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(sqlx::error::DatabaseError::is_unique_violation)
}

fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StorageError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::Configuration(_) => StorageError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StorageError::InvalidData(message),
        _ => StorageError::Query(message),
    }
}

#[async_trait]
impl ReadRepository for PostgresRepository {
    async fn find_by_code(&self, code: &ShortCode) -> Result<Option<ShortLink>> {
        let row = sqlx::query(
            r#"
            SELECT id::BIGINT AS id, short_code, long_url,
                   (EXTRACT(EPOCH FROM created_at) * 1000000)::BIGINT AS created_at_us
            FROM urls
            WHERE short_code = $1
            LIMIT 1
            "#,
        )
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(link_from_row).transpose()
    }

    async fn find_by_long_url(&self, long_url: &str) -> Result<Option<ShortLink>> {
        let row = sqlx::query(
            r#"
            SELECT id::BIGINT AS id, short_code, long_url,
                   (EXTRACT(EPOCH FROM created_at) * 1000000)::BIGINT AS created_at_us
            FROM urls
            WHERE long_url = $1
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(long_url)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(link_from_row).transpose()
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_or_insert(&self, long_url: &str, code: &ShortCode) -> Result<Upsert> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        // Released automatically at commit or rollback.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(long_url)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        let existing = sqlx::query(
            r#"
            SELECT id::BIGINT AS id, short_code, long_url,
                   (EXTRACT(EPOCH FROM created_at) * 1000000)::BIGINT AS created_at_us
            FROM urls
            WHERE long_url = $1
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(long_url)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        if let Some(row) = existing {
            let link = link_from_row(&row)?;
            tx.commit().await.map_err(map_sqlx_error)?;
            debug!(code = %link.short_code, "long url already shortened");
            return Ok(Upsert::Existing(link));
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO urls (short_code, long_url)
            VALUES ($1, $2)
            RETURNING id::BIGINT AS id, short_code, long_url,
                      (EXTRACT(EPOCH FROM created_at) * 1000000)::BIGINT AS created_at_us
            "#,
        )
        .bind(code.as_str())
        .bind(long_url)
        .fetch_one(&mut *tx)
        .await;

        let row = match inserted {
            Ok(row) => row,
            Err(err) if is_unique_violation(&err) => {
                return Err(StorageError::Conflict(code.to_string()))
            }
            Err(err) => return Err(map_sqlx_error(err)),
        };

        let link = link_from_row(&row)?;
        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(Upsert::Created(link))
    }
}
