use std::sync::Arc;

use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use fastfood_orders::auth::TokenService;
use fastfood_orders::config::{Config, StorageBackend};
use fastfood_orders::domain::user::UserService;
use fastfood_orders::http::{self, AppState};
use fastfood_orders::metrics::{self, Metrics};
use fastfood_orders::store::{MemoryStore, PgStore, Store, StoreError};
use fastfood_orders::utils::{retry_on_transient, RetryConfig};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Default to INFO, override with RUST_LOG
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,fastfood_orders=debug")),
        )
        .init();

    tracing::info!("🚀 Starting fast-food order service");

    let config = Config::from_env().context("invalid configuration")?;

    // === 1. Storage ===
    let store: Arc<dyn Store> = match config.storage {
        StorageBackend::Postgres => {
            let url = config
                .database_url
                .clone()
                .context("DATABASE_URL is required for the postgres backend")?;
            let max_connections = config.database_max_connections;

            tracing::info!("Connecting to PostgreSQL...");
            let store = retry_on_transient("database_bootstrap", RetryConfig::database_bootstrap(), |_| {
                let url = url.clone();
                async move {
                    let store = PgStore::connect(&url, max_connections).await?;
                    store.migrate().await?;
                    Ok::<_, StoreError>(store)
                }
            })
            .await
            .into_result()
            .context("failed to prepare the database")?;
            Arc::new(store)
        }
        StorageBackend::Memory => {
            tracing::warn!("Using the in-memory store; data is lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    // === 2. Metrics ===
    let metrics = Arc::new(Metrics::new()?);
    tracing::info!("📊 Metrics registry created with {} metrics", metrics.registry().gather().len());

    // === 3. Bootstrap admin account ===
    if let Some((email, password)) = &config.admin {
        UserService::new(store.clone(), config.bcrypt_cost)
            .ensure_admin(email, password)
            .await
            .context("failed to seed the admin account")?;
    }

    // === 4. HTTP servers ===
    let tokens = TokenService::new(&config.jwt_secret, config.token_ttl_minutes);
    let state = web::Data::new(AppState::new(store, metrics.clone(), tokens, config.bcrypt_cost));

    tracing::info!("Listening on http://{}:{}", config.host, config.port);
    let api = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .app_data(http::json_config())
            .app_data(http::path_config())
            .app_data(http::query_config())
            .wrap(http::security_headers())
            .wrap(Logger::default())
            .configure(http::configure)
    })
    .bind((config.host.clone(), config.port))
    .with_context(|| format!("failed to bind {}:{}", config.host, config.port))?
    .run();

    let metrics_server = metrics::start_metrics_server(
        metrics.registry().clone(),
        config.host.clone(),
        config.metrics_port,
    );

    tokio::try_join!(api, metrics_server)?;

    tracing::info!("Server stopped");
    Ok(())
}
