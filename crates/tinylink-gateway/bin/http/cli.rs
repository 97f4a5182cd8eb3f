use clap::{Parser, ValueEnum};
use std::fmt::{Display, Formatter};
use std::net::{Ipv4Addr, SocketAddr};
use std::str::FromStr;
use tinylink_generator::random::DEFAULT_LENGTH;
use tinylink_shortener::DEFAULT_MAX_ATTEMPTS;
use tinylink_storage::{PgSslMode, PostgresConfig};
use tinylink_telemetry::LogFormat;

pub const DEFAULT_PORT: u16 = 3001;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackendArg {
    #[value(name = "postgres")]
    Postgres,
    #[value(name = "in-memory")]
    InMemory,
}

impl Display for StorageBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackendArg::Postgres => write!(f, "postgres"),
            StorageBackendArg::InMemory => write!(f, "in-memory"),
        }
    }
}

fn parse_ssl_mode(value: &str) -> Result<PgSslMode, String> {
    PgSslMode::from_str(value).map_err(|e| e.to_string())
}

#[derive(Debug, Parser)]
#[command(name = "tinylink", about = "URL shortener HTTP server")]
pub struct CLI {
    /// Full listen address; overrides --port.
    #[arg(long, env = "LISTEN_ADDR")]
    pub listen_addr: Option<SocketAddr>,

    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Prefix of returned short URLs. Defaults to http://localhost:<port>.
    #[arg(long, env = "PUBLIC_DOMAIN")]
    pub public_domain: Option<String>,

    #[arg(
        long,
        env = "STORAGE_BACKEND",
        value_enum,
        default_value_t = StorageBackendArg::Postgres
    )]
    pub storage: StorageBackendArg,

    #[arg(long, env = "DB_HOST", default_value = "localhost")]
    pub db_host: String,

    #[arg(long, env = "DB_PORT", default_value_t = 5432)]
    pub db_port: u16,

    #[arg(long, env = "DB_USER")]
    pub db_user: Option<String>,

    #[arg(long, env = "DB_PASSWORD", hide_env_values = true)]
    pub db_password: Option<String>,

    #[arg(long, env = "DB_NAME")]
    pub db_name: Option<String>,

    #[arg(long, env = "DB_SSL_MODE", default_value = "prefer", value_parser = parse_ssl_mode)]
    pub db_ssl_mode: PgSslMode,

    #[arg(long, env = "DB_MAX_CONNECTIONS", default_value_t = 10)]
    pub db_max_connections: u32,

    #[arg(long, env = "CODE_LENGTH", default_value_t = DEFAULT_LENGTH)]
    pub code_length: usize,

    /// Generated codes tried per request before reporting an error.
    #[arg(long, env = "SHORTEN_MAX_ATTEMPTS", default_value_t = DEFAULT_MAX_ATTEMPTS)]
    pub max_attempts: usize,

    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

impl CLI {
    pub fn listen_addr(&self) -> SocketAddr {
        self.listen_addr
            .unwrap_or_else(|| SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port)))
    }

    pub fn public_domain(&self) -> String {
        self.public_domain
            .clone()
            .unwrap_or_else(|| format!("http://localhost:{}", self.listen_addr().port()))
    }

    pub fn postgres_config(&self) -> Result<PostgresConfig, &'static str> {
        let username = self
            .db_user
            .clone()
            .ok_or("DB_USER is required when storage backend is postgres")?;
        let database = self
            .db_name
            .clone()
            .ok_or("DB_NAME is required when storage backend is postgres")?;

        let config = PostgresConfig::builder()
            .host(self.db_host.clone())
            .port(self.db_port)
            .username(username)
            .database(database)
            .ssl_mode(self.db_ssl_mode)
            .max_connections(self.db_max_connections)
            .build();

        Ok(PostgresConfig {
            password: self.db_password.clone(),
            ..config
        })
    }
}
