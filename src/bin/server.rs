use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use helpdesk_reports::app_state::AppState;
use helpdesk_reports::config::{Config, StoreBackend};
use helpdesk_reports::database;
use helpdesk_reports::router::create_router;
use helpdesk_reports::store::{MemoryStore, MySqlStore};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("FATAL ERROR: {}", e);
        eprintln!("Error details: {:?}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "helpdesk_reports=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("=== Helpdesk Reports Service Starting ===");
    match dotenv {
        Ok(path) => tracing::info!("Environment variables loaded from {}", path.display()),
        Err(_) => tracing::info!("No .env file found, using system environment variables"),
    }

    let config = Config::from_env().context("failed to read configuration")?;
    config.validate().context("invalid configuration")?;
    tracing::info!("Store backend: {}", config.store_backend);
    tracing::info!("Upload directory: {}", config.upload_dir.display());
    tracing::info!("Assignee roster: {} people", config.roster.len());

    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .with_context(|| format!("cannot create upload directory {}", config.upload_dir.display()))?;

    let state = match config.store_backend {
        StoreBackend::Mysql => {
            let pool = database::create_pool(&config).await?;
            database::schema::initialize_schema(&pool).await?;
            tracing::info!("Database schema initialized successfully");

            let roster = Arc::new(config.roster.clone());
            let store = Arc::new(MySqlStore::new(pool, roster.clone()));
            AppState {
                reports: store.clone(),
                users: store,
                roster,
                upload_dir: config.upload_dir.clone(),
            }
        }
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store; data is lost on restart");
            AppState::in_memory(MemoryStore::new(), config.roster.clone(), config.upload_dir.clone())
        }
    };

    let app = create_router(state, config.body_limit_bytes);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("cannot bind {}", addr))?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down gracefully...");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal, shutting down gracefully...");
        },
    }
}
