use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;

mod config;
mod database;
mod dtos;
mod errors;
mod handlers;
mod middleware;
mod models;
mod routes;
mod services;
mod state;

use config::AppConfig;
use database::connection::get_db_client;
use database::payment_store::{InMemoryPaymentStore, MongoPaymentStore, PaymentStore};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let config = AppConfig::from_env().context("Failed to load configuration")?;
    tracing::info!("🌐 PayU environment: {}", config.payu_environment);
    tracing::info!("💳 Payment URL: {}", config.payment_url());

    let payments = initialize_store(&config).await?;
    let addr = SocketAddr::new(
        config.host.parse().context("HOST must be an IP address")?,
        config.port,
    );

    let app = routes::app_router(AppState::new(config, payments));
    start_server(app, addr).await
}

async fn initialize_store(config: &AppConfig) -> anyhow::Result<Arc<dyn PaymentStore>> {
    match config.database_url.as_deref() {
        Some(url) => {
            let db = get_db_client(url, &config.database_name)
                .await
                .context("Failed to connect to MongoDB")?;
            tracing::info!("✅ Payment records stored in MongoDB");
            Ok(Arc::new(MongoPaymentStore::new(&db)))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, payment records are kept in memory");
            Ok(Arc::new(InMemoryPaymentStore::new()))
        }
    }
}

async fn start_server(app: axum::Router, addr: SocketAddr) -> anyhow::Result<()> {
    tracing::info!("🚀 Server starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    axum::serve(listener, app).await?;
    Ok(())
}
