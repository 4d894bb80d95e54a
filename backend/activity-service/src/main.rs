use std::sync::Arc;

use activity_service::config::Config;
use activity_service::{handlers, AppState, IndexCatalog, OpenSearchGateway, SearchGateway};
use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[actix_web::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,activity_service=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting activity-service");

    let config = Config::from_env().context("Failed to load configuration")?;
    config
        .validate()
        .context("Configuration validation failed")?;
    info!("Configuration loaded and validated");

    let catalog = IndexCatalog::load(config.index_catalog_path.as_deref())
        .context("Failed to load index catalog")?;
    info!(indices = catalog.all().len(), "Index catalog loaded");

    let gateway = OpenSearchGateway::new(
        &config.opensearch_host,
        &config.opensearch_username,
        &config.opensearch_password,
        config.search_timeout(),
    )
    .context("Failed to create OpenSearch client")?;
    gateway
        .ping()
        .await
        .context("Failed to ping OpenSearch")?;
    info!(host = %config.opensearch_host, "OpenSearch client connected");

    let state = AppState::new(
        Arc::new(gateway),
        &config.clients_index,
        Arc::new(catalog),
        config.batch_timeout(),
    );
    let state = web::Data::new(state);

    info!("Starting HTTP server on {}:{}", config.app_host, config.app_port);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(tracing_actix_web::TracingLogger::default())
            .configure(handlers::configure)
    })
    .bind((config.app_host.as_str(), config.app_port))
    .context("Failed to bind HTTP server")?
    .run()
    .await
    .context("HTTP server error")
}
