// src/handlers/profile.rs
use crate::error::ApiError;
use crate::handlers::auth::caller_id;
use crate::middleware::auth::auth_middleware;
use crate::models::auth::Claims;
use crate::models::profile::{DetailsRequest, Profile, ProfilePatch, ProfileQuery, ProfileUpdate};
use crate::prompt::{compose_system_prompt, PromptFields};
use crate::store::normalize_email;
use crate::AppState;
use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::json;
use std::sync::Arc;

pub fn profile_routes() -> Router {
    Router::new()
        .route("/api/createDetails", post(save_details))
        .route("/api/update-details", post(save_details))
        .route("/profile", get(get_profile).put(update_profile))
        .route("/api/system-prompt", get(system_prompt))
        .layer(axum::middleware::from_fn(auth_middleware))
}

/// Saves the whole details form for the caller's email. Both the create and update
/// forms post here; a field left out or sent as null is cleared.
async fn save_details(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<DetailsRequest>,
) -> Result<(StatusCode, Json<Profile>), ApiError> {
    let email = normalize_email(&payload.email);
    if email.is_empty() {
        return Err(ApiError::BadRequest("Email is required".to_string()));
    }
    if email != normalize_email(&claims.email) {
        return Err(ApiError::Forbidden(
            "Cannot modify another account's details".to_string(),
        ));
    }

    let update = ProfileUpdate::from(payload);
    let profile = state.store.replace_profile(&email, &update).await?;
    tracing::info!(profile_id = profile.id, "profile details saved");

    Ok((StatusCode::CREATED, Json(profile)))
}

async fn get_profile(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ProfileQuery>,
) -> Result<Json<Profile>, ApiError> {
    if query.id != caller_id(&claims)? {
        return Err(ApiError::Forbidden("Cannot read another account's profile".to_string()));
    }

    let profile = state
        .store
        .profile_for_account(query.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Profile not found".to_string()))?;

    Ok(Json(profile))
}

async fn update_profile(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(patch): Json<ProfilePatch>,
) -> Result<Json<Profile>, ApiError> {
    if patch.id != caller_id(&claims)? {
        return Err(ApiError::Forbidden(
            "Cannot update another account's profile".to_string(),
        ));
    }

    let profile = state.store.update_profile(patch.id, &patch.fields).await?;
    Ok(Json(profile))
}

async fn system_prompt(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let profile = state
        .store
        .profile_for_account(caller_id(&claims)?)
        .await?
        .unwrap_or_default();

    let prompt = compose_system_prompt(&PromptFields::from(&profile));
    Ok(Json(json!({ "system_prompt": prompt })))
}
