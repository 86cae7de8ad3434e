//! City Library - catalog and lending server
//!
//! Runs either the interactive console menu or the REST API, depending on
//! configuration.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::io::BufReader;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use citylibrary::{
    api,
    config::{AppConfig, Interface},
    console::Console,
    repository,
    services::LendingCore,
    AppError, AppState,
};

fn init_tracing(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("citylibrary={},tower_http=debug", config.logging.level).into());

    // Console mode owns stdout, so logs always go to stderr
    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;
    init_tracing(&config);

    tracing::info!("Starting City Library v{}", env!("CARGO_PKG_VERSION"));

    let gateway = repository::open_gateway(&config)
        .await
        .map_err(AppError::StorageUnavailable)
        .context("Failed to open storage")?;
    let mut core = LendingCore::open(gateway)
        .await
        .context("Failed to load library state")?;

    let interface = config.interface;
    match interface {
        Interface::Console => {
            let mut console = Console::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout());
            console.run(&mut core).await?;
        }
        Interface::Http => {
            let addr = SocketAddr::new(
                config.server.host.parse().context("Invalid host address")?,
                config.server.port,
            );
            let app = api::create_router(AppState::new(config, core));

            tracing::info!("Server listening on http://{}", addr);

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
