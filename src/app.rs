use axum::http::{header, HeaderValue, Method};
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::Config;
use crate::db::{AnnotationStore, MemStore, UserStore};
use crate::docs::ApiDoc;
use crate::routes::create_api_routes;
use crate::services::persistence::{PersistHandle, RetryPolicy};
use crate::websocket::handler::websocket_handler;
use crate::ws::multiplexer::Multiplexer;
use crate::ws::roomctx::RoomStateCache;

/// Everything the relay and the HTTP handlers share. One instance per server,
/// handed to handlers through axum state.
pub struct AppState {
    pub config: Config,
    pub rooms: RoomStateCache,
    pub mux: Multiplexer,
    pub annotations: Arc<dyn AnnotationStore>,
    pub users: Arc<dyn UserStore>,
    pub persist: PersistHandle,
}

impl AppState {
    /// Build the state and start the annotation writer on the current runtime.
    pub fn new(config: Config, annotations: Arc<dyn AnnotationStore>, users: Arc<dyn UserStore>) -> Self {
        let policy = RetryPolicy {
            max_attempts: config.persist_max_attempts,
            backoff: config.persist_backoff(),
        };
        let persist = PersistHandle::spawn(annotations.clone(), policy);
        let rooms = RoomStateCache::new(config.room_state_max_capacity, config.room_state_idle());

        Self {
            config,
            rooms,
            mux: Multiplexer::new(),
            annotations,
            users,
            persist,
        }
    }

    /// State backed by the in-memory store
    pub fn in_memory(config: Config) -> Self {
        let store = Arc::new(MemStore::new());
        Self::new(config, store.clone(), store)
    }
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins = config.cors_origin_list();
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring invalid CORS origin '{}': {}", origin, e);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

/// Assemble the full application router
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Live room connections
        .route("/ws", get(websocket_handler))
        // Mount API routes
        .nest("/api", create_api_routes(&state.config))
        // Uploaded documents
        .nest_service("/uploads", ServeDir::new(&state.config.upload_dir))
        // Mount Swagger UI
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors_layer(&state.config))
        // Add tracing layer
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
