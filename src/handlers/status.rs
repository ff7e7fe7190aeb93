use crate::AppState;
use axum::{extract::Extension, response::Json};
use serde_json::json;
use std::sync::Arc;

// API Status endpoint
pub async fn api_status(Extension(state): Extension<Arc<AppState>>) -> Json<serde_json::Value> {
    let db_status = match state.store.ping().await {
        Ok(_) => "healthy",
        Err(e) => {
            tracing::warn!("Status check could not reach the profile store: {}", e);
            "unhealthy"
        }
    };

    let chat_backend = state
        .chat_backend
        .as_ref()
        .map(|b| b.describe())
        .unwrap_or_else(|| "not_configured".to_string());

    Json(json!({
        "status": "operational",
        "version": env!("CARGO_PKG_VERSION"),
        "services": {
            "database": db_status,
            "chat_backend": chat_backend,
        },
        "endpoints": {
            "register": "/api/register",
            "login": "/api/login",
            "profile": "/profile",
            "chat": "/api/chat",
            "status": "/api/status"
        }
    }))
}
