use actix_middleware::JwtAuthMiddleware;
use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use crypto_core::JwtKeys;
use std::sync::Arc;
use tracing::info;
use tracing_actix_web::TracingLogger;

use social_service::config::Config;
use social_service::handlers;
use social_service::repository::{MemorySocialStore, PgSocialStore, SocialStore};
use social_service::AppState;

async fn build_store(config: &Config) -> Result<Arc<dyn SocialStore>> {
    match &config.database.url {
        Some(url) => {
            let store = PgSocialStore::connect(&config.database, url).await?;
            store.run_migrations().await?;
            info!("Connected to PostgreSQL and applied migrations");
            Ok(Arc::new(store))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory store (data is lost on restart)");
            Ok(Arc::new(MemorySocialStore::new()))
        }
    }
}

#[actix_web::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    agora_common::telemetry::init_tracing("social-service");

    let config = Config::from_env().context("Failed to load configuration")?;
    info!(env = %config.app.env, "Starting social-service");

    let store = build_store(&config).await?;
    let keys = Arc::new(JwtKeys::with_ttl(
        &config.auth.jwt_secret,
        chrono::Duration::hours(config.auth.token_ttl_hours),
    ));
    let state = AppState::new(store, keys.clone(), config.pagination);

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

    info!("social-service shut down");
    Ok(())
}
