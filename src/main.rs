use std::{error::Error, sync::Arc};

use clap::Parser;
use fintrack::{
    api::{self, AppState},
    config::{CliArgs, Command, Config, LoggingConfig},
    storage::{self, StorageBackend, StorageError},
    summary::Summary,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::EnvFilter;

type BoxError = Box<dyn Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let cli = CliArgs::parse();
    let config = Config::load(&cli);
    init_tracing(&config.logging);

    let storage_config = config.storage.clone();
    let storage = tokio::task::spawn_blocking(move || storage::open(&storage_config)).await??;
    tracing::info!(backend = ?config.storage.backend, "Storage ready");

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(&config, storage).await,
        Command::Report { year } => report(storage, year).await,
    }
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn serve(config: &Config, storage: Arc<dyn StorageBackend>) -> Result<(), BoxError> {
    let result = run_server(config, storage.clone()).await;
    storage::close(storage).await;
    result
}

async fn run_server(config: &Config, storage: Arc<dyn StorageBackend>) -> Result<(), BoxError> {
    let mut state = AppState::new(storage);
    if config.metrics.enabled {
        state.metrics = Some(PrometheusBuilder::new().install_recorder()?);
    }
    let app = api::router(state);

    let addr = config.listen_addr()?;
    tracing::info!(%addr, "API listening");

    axum::Server::try_bind(&addr)?
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

async fn report(storage: Arc<dyn StorageBackend>, year: Option<i64>) -> Result<(), BoxError> {
    let (salaries, expenses) = tokio::task::spawn_blocking(move || {
        Ok::<_, StorageError>((storage.list_salaries()?, storage.list_expenses()?))
    })
    .await??;

    println!("{}", Summary::build(&salaries, &expenses, year));
    Ok(())
}
