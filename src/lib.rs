// lib.rs - Health companion API server and client core
pub mod client;
pub mod config;
pub mod conversations;
pub mod db;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod prompt;
pub mod store;

use axum::{Extension, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::config::Config;
use crate::conversations::ConversationRegistry;
use crate::dispatcher::ChatBackend;
use crate::middleware::rate_limit::RateLimiter;
use crate::store::ProfileStore;

// AppState holds the profile store, the chat backend (if configured), the in-process
// chat transcripts and the limiter guarding the credential endpoints
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn ProfileStore>,
    pub chat_backend: Option<Arc<dyn ChatBackend>>,
    pub conversations: ConversationRegistry,
    pub auth_limiter: RateLimiter,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn ProfileStore>,
        chat_backend: Option<Arc<dyn ChatBackend>>,
    ) -> Self {
        let auth_limiter = RateLimiter::new(config.auth_rate_limit, 60);
        Self {
            config,
            store,
            chat_backend,
            conversations: ConversationRegistry::new(),
            auth_limiter,
        }
    }
}

/// Builds the full application router with all routes and shared state attached.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(handlers::ui::ui_routes())
        .merge(handlers::auth::auth_routes())
        .merge(handlers::profile::profile_routes())
        .merge(handlers::chat::chat_routes())
        .route("/api/status", axum::routing::get(handlers::status::api_status))
        .layer(axum::middleware::from_fn(middleware::logging::request_logging_middleware))
        .layer(CorsLayer::permissive())
        .layer(Extension(state))
}
