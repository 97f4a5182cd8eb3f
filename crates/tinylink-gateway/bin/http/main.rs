mod cli;

use crate::cli::{StorageBackendArg, CLI};
use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tinylink_core::Repository;
use tinylink_gateway::{App, AppState};
use tinylink_generator::RandomGenerator;
use tinylink_shortener::ShortenerService;
use tinylink_storage::{InMemoryRepository, PostgresRepository};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CLI::parse();
    tinylink_telemetry::init(config.log_format)?;

    info!(
        listen_addr = %config.listen_addr(),
        public_domain = %config.public_domain(),
        storage_backend = %config.storage,
        code_length = config.code_length,
        "starting tinylink server"
    );

    let generator = RandomGenerator::new(config.code_length)?;

    match config.storage {
        StorageBackendArg::InMemory => {
            warn!("in-memory storage selected, links are lost on exit");
            run_server(&config, InMemoryRepository::new(), generator).await
        }
        StorageBackendArg::Postgres => {
            let pg_config = config.postgres_config().map_err(anyhow::Error::msg)?;
            let repository = init_database(&pg_config).await.inspect_err(|e| {
                error!(error = %e, "database initialization failed");
            })?;
            run_server(&config, repository, generator).await
        }
    }
}

async fn init_database(
    pg_config: &tinylink_storage::PostgresConfig,
) -> anyhow::Result<PostgresRepository> {
    let repository = PostgresRepository::connect(pg_config)
        .await
        .context("connecting to postgres")?;
    repository
        .ensure_schema()
        .await
        .context("creating table 'urls'")?;
    Ok(repository)
}

async fn run_server<R: Repository>(
    config: &CLI,
    repository: R,
    generator: RandomGenerator,
) -> anyhow::Result<()> {
    let shortener =
        ShortenerService::new(repository, generator).with_max_attempts(config.max_attempts);
    let state = AppState::new(Arc::new(shortener), config.public_domain());

    let listener = tokio::net::TcpListener::bind(config.listen_addr()).await?;
    info!(listen_addr = %listener.local_addr()?, "server is running");

    axum::serve(listener, App::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("gracefully exited.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install ctrl-c handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}
