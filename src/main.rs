use secrecy::ExposeSecret;
use std::{net::SocketAddr, sync::Arc};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bankcards::api::{self, AppState};
use bankcards::config::{Config, StorageBackend};
use bankcards::db;
use bankcards::repository::{CardRepository, InMemoryCardRepository, PgCardRepository};
use bankcards::services::card_service::CardService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bankcards=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting card service...");

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!(storage = ?config.storage, "Configuration loaded successfully");

    // Open storage; the pool is kept so it can be closed on shutdown
    let (repo, pool) = match config.storage {
        StorageBackend::Postgres => {
            let database_url = config
                .database_url
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("database_url is not configured"))?;

            let pool =
                db::create_pool(database_url.expose_secret(), config.database_max_connections)
                    .await?;
            tracing::info!("Database pool created");

            db::run_migrations(&pool).await?;
            tracing::info!("Database migrations completed");

            let repo: Arc<dyn CardRepository> = Arc::new(PgCardRepository::new(pool.clone()));
            (repo, Some(pool))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage, cards are lost on restart");
            let repo: Arc<dyn CardRepository> = Arc::new(InMemoryCardRepository::new());
            (repo, None)
        }
    };

    // Build application state
    let state = AppState {
        cards: CardService::new(repo),
    };

    let app = api::app(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    tracing::info!("Listening on {}", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(pool) = pool {
        pool.close().await;
        tracing::info!("Database pool closed");
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install CTRL+C signal handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, cleaning up...");
}
