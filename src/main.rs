mod app;
mod config;
mod db;
mod docs;
mod handlers;
mod models;
mod routes;
mod services;
mod websocket;
mod ws;

use app::{build_router, AppState};
use config::Config;
use db::{AnnotationStore, DbStore, MemStore, UserStore};
use std::panic;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

type Stores = (Arc<dyn AnnotationStore>, Arc<dyn UserStore>);

fn memory_stores() -> Stores {
    let store = Arc::new(MemStore::new());
    (store.clone(), store)
}

/// Pick the durable store: Postgres when configured and reachable, memory otherwise
async fn open_stores(config: &Config) -> Option<Stores> {
    let Some(db_url) = &config.db_url else {
        warn!("No database URL configured - annotations and users are kept in memory only");
        return Some(memory_stores());
    };

    match DbStore::open(db_url).await {
        Ok(store) => {
            info!("Database initialized successfully");
            let store = Arc::new(store);
            let stores: Stores = (store.clone(), store);
            Some(stores)
        }
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            if config.is_production() {
                return None;
            }
            warn!("Falling back to the in-memory store");
            Some(memory_stores())
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main(flavor = "current_thread")]
async fn main() {

    // Set panic hook for better error messages
    panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
    }));

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            // Default to info level, but allow debug for our app
            "collab_viewer=debug,tower_http=debug,axum::rejection=trace,info".into()
        }))
        .init();

    info!("Starting server...");

    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        error!("Failed to load configuration: {}", e);
        warn!("Using default configuration");
        Config::default()
    });

    if config.is_production() && config.db_url.is_none() {
        error!("A database URL is required in production");
        return;
    }
    if config.auth_jwt_secret.is_none() {
        warn!("No JWT secret configured - login is disabled");
    }

    // Open the durable store
    let Some((annotations, users)) = open_stores(&config).await else {
        error!("No durable store available, refusing to start");
        return;
    };

    let address = config.server_address();
    let state = Arc::new(AppState::new(config, annotations, users));
    let app_routes = build_router(state.clone());

    // Start the HTTP/WebSocket server
    let listener = match tokio::net::TcpListener::bind(&address).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", address, e);
            return;
        }
    };

    info!("🚀 Server running on http://{}", address);
    info!("📡 WebSocket available at ws://{}/ws", address);
    info!("📚 Swagger UI available at http://{}/swagger", address);

    if let Err(e) = axum::serve(listener, app_routes)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", e);
    }

    // Drain queued annotation writes before exiting
    state.persist.flush().await;
    let stats = state.persist.stats();
    info!(
        "Server stopped ({} annotations persisted, {} dropped)",
        stats.persisted, stats.failures
    );
}
