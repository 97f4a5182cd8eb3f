pub mod memory;
pub mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::{PgSslMode, PostgresConfig, PostgresRepository};
pub use tinylink_core::{ReadRepository, Repository, StorageError};
