use actix_middleware::JwtAuthMiddleware;
use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use crypto_core::JwtKeys;
use std::sync::Arc;
use tracing::info;
use tracing_actix_web::TracingLogger;

use catalog_service::config::Config;
use catalog_service::handlers;
use catalog_service::repository::{CatalogStore, MemoryCatalogStore, PgCatalogStore};
use catalog_service::AppState;

#[actix_web::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    agora_common::telemetry::init_tracing("catalog-service");

    let config = Config::from_env().context("Failed to load configuration")?;
    info!(env = %config.app.env, "Starting catalog-service");

    let store: Arc<dyn CatalogStore> = match &config.database.url {
        Some(url) => {
            let store = PgCatalogStore::connect(&config.database, url).await?;
            store.run_migrations().await?;
            info!("Connected to PostgreSQL and applied migrations");
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; serving an in-memory catalog");
            Arc::new(MemoryCatalogStore::new())
        }
    };

    let keys = Arc::new(JwtKeys::from_secret(&config.auth.jwt_secret));
    let state = AppState::new(store);

    let bind_addr = format!("{}:{}", config.app.host, config.app.http_port);
    info!("HTTP server listening on {}", bind_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(JwtAuthMiddleware::new(keys.clone()))
            .wrap(TracingLogger::default())
            .configure(handlers::configure)
    })
    .bind(&bind_addr)
    .with_context(|| format!("Failed to bind {bind_addr}"))?
    .run()
    .await
    .context("HTTP server error")?;

    Ok(())
}
