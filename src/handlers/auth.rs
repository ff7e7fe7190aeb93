use crate::error::ApiError;
use crate::middleware::auth::auth_middleware;
use crate::middleware::rate_limit::auth_rate_limit_middleware;
use crate::models::auth::*;
use crate::store::normalize_email;
use crate::AppState;
use axum::{
    extract::Extension,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use regex::Regex;
use std::sync::{Arc, OnceLock};

pub const MIN_PASSWORD_LEN: usize = 6;

pub fn auth_routes() -> Router {
    let public_routes = Router::new()
        .route("/api/register", post(register))
        .route("/api/login", post(login))
        .layer(axum::middleware::from_fn(auth_rate_limit_middleware));

    let protected_routes = Router::new()
        .route("/api/auth/verify", get(verify_token))
        .route("/me", get(me))
        .layer(axum::middleware::from_fn(auth_middleware));

    public_routes.merge(protected_routes)
}

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex is valid"))
}

pub fn validate_credentials(credentials: &Credentials) -> Result<(), ApiError> {
    if credentials.email.trim().is_empty() || credentials.password.is_empty() {
        return Err(ApiError::BadRequest(
            "Email and password are required".to_string(),
        ));
    }
    if !email_pattern().is_match(credentials.email.trim()) {
        return Err(ApiError::BadRequest("Invalid email address".to_string()));
    }
    if credentials.password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::BadRequest(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

async fn register(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<Credentials>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    validate_credentials(&payload)?;

    let password_hash = hash(&payload.password, DEFAULT_COST).map_err(|e| {
        ApiError::Internal(format!("Error hashing password: {}", e))
    })?;

    let account = state
        .store
        .create_account(&payload.email, &password_hash)
        .await?;

    let token = generate_jwt_token(&account, &state.config.jwt_secret, state.config.token_ttl_hours)?;

    tracing::info!(account_id = account.id, "registered new account");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            success: true,
            message: "Account created".to_string(),
            id: account.id,
            email: account.email,
            token,
        }),
    ))
}

async fn login(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<Credentials>,
) -> Result<Json<LoginResponse>, ApiError> {
    if payload.email.trim().is_empty() || payload.password.is_empty() {
        return Err(ApiError::BadRequest(
            "Email and password are required".to_string(),
        ));
    }

    let invalid = || ApiError::Unauthorized("Login credentials incorrect".to_string());

    let account = match state.store.find_account_by_email(&payload.email).await? {
        Some(account) => account,
        None => {
            tracing::info!("Login attempt for unknown email");
            return Err(invalid());
        }
    };

    match verify(&payload.password, &account.password_hash) {
        Ok(true) => {}
        Ok(false) => {
            tracing::info!(account_id = account.id, "Login details incorrect");
            return Err(invalid());
        }
        Err(e) => {
            return Err(ApiError::Internal(format!("Error verifying password: {}", e)));
        }
    }

    let profile = state
        .store
        .profile_for_email(&normalize_email(&account.email))
        .await?;
    let token = generate_jwt_token(&account, &state.config.jwt_secret, state.config.token_ttl_hours)?;

    Ok(Json(LoginResponse::new(&account, profile, token)))
}

pub fn generate_jwt_token(account: &Account, secret: &str, ttl_hours: i64) -> Result<String, ApiError> {
    let now = Utc::now();
    let expiration = now
        .checked_add_signed(Duration::hours(ttl_hours))
        .ok_or_else(|| ApiError::Internal("token expiry overflow".to_string()))?
        .timestamp();

    let claims = Claims {
        sub: account.id.to_string(),
        email: account.email.clone(),
        exp: expiration as usize,
        iat: now.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )
    .map_err(|e| ApiError::Internal(format!("Error generating JWT token: {}", e)))
}

pub fn verify_jwt_token(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )?;

    Ok(token_data.claims)
}

/// Account id carried by the verified token.
pub fn caller_id(claims: &Claims) -> Result<i32, ApiError> {
    claims
        .account_id()
        .ok_or_else(|| ApiError::Unauthorized("Malformed token subject".to_string()))
}

async fn verify_token(Extension(claims): Extension<Claims>) -> Result<Json<VerifyResponse>, ApiError> {
    Ok(Json(VerifyResponse {
        valid: true,
        account_id: caller_id(&claims)?,
        email: claims.email,
        exp: claims.exp,
    }))
}

async fn me(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<MeResponse>, ApiError> {
    let account = state
        .store
        .find_account(caller_id(&claims)?)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Account not found".to_string()))?;

    Ok(Json(MeResponse {
        id: account.id,
        email: account.email,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_router;
    use crate::models::profile::ProfileUpdate;
    use crate::test_support::{body_json, empty_request, json_request, test_state};
    use serde_json::json;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_register_then_login_returns_profile_fields() {
        let state = test_state(None);

        let response = build_router(state.clone())
            .oneshot(json_request(
                "POST",
                "/api/register",
                None,
                json!({"Email": "jane@example.com", "Password": "secret-pass"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let registered = body_json(response).await;
        assert_eq!(registered["email"], "jane@example.com");

        state
            .store
            .upsert_profile(
                "jane@example.com",
                &ProfileUpdate {
                    username: Some("Jane".into()),
                    diagnosis: Some("Type 2 Diabetes".into()),
                    prescription: Some("Metformin".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let response = build_router(state.clone())
            .oneshot(json_request(
                "POST",
                "/api/login",
                None,
                json!({"Email": "Jane@Example.com", "Password": "secret-pass"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["id"], registered["id"]);
        assert_eq!(body["patient_name"], "Jane");
        assert_eq!(body["diagnosis"], "Type 2 Diabetes");
        assert_eq!(body["prescription"], "Metformin");
        assert!(body["token"].as_str().unwrap().len() > 20);
    }

    #[tokio::test]
    async fn test_login_failures_return_401_without_profile() {
        let state = test_state(None);
        build_router(state.clone())
            .oneshot(json_request(
                "POST",
                "/api/register",
                None,
                json!({"Email": "sam@example.com", "Password": "right-pass"}),
            ))
            .await
            .unwrap();

        for creds in [
            json!({"Email": "sam@example.com", "Password": "wrong-pass"}),
            json!({"Email": "nobody@example.com", "Password": "right-pass"}),
        ] {
            let response = build_router(state.clone())
                .oneshot(json_request("POST", "/api/login", None, creds))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            let body = body_json(response).await;
            assert_eq!(body["success"], false);
            assert!(body.get("patient_name").is_none());
            assert!(body.get("token").is_none());
        }
    }

    #[tokio::test]
    async fn test_register_validation_and_conflict() {
        let state = test_state(None);

        let response = build_router(state.clone())
            .oneshot(json_request(
                "POST",
                "/api/register",
                None,
                json!({"Email": "not-an-email", "Password": "secret-pass"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = build_router(state.clone())
            .oneshot(json_request(
                "POST",
                "/api/register",
                None,
                json!({"Email": "x@example.com", "Password": "123"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let creds = json!({"Email": "dup@example.com", "Password": "secret-pass"});
        let first = build_router(state.clone())
            .oneshot(json_request("POST", "/api/register", None, creds.clone()))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::CREATED);
        let second = build_router(state.clone())
            .oneshot(json_request("POST", "/api/register", None, creds))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_verify_and_me_require_valid_token() {
        let state = test_state(None);
        let response = build_router(state.clone())
            .oneshot(json_request(
                "POST",
                "/api/register",
                None,
                json!({"Email": "tok@example.com", "Password": "secret-pass"}),
            ))
            .await
            .unwrap();
        let token = body_json(response).await["token"].as_str().unwrap().to_string();

        let response = build_router(state.clone())
            .oneshot(empty_request("GET", "/api/auth/verify", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["email"], "tok@example.com");

        let response = build_router(state.clone())
            .oneshot(empty_request("GET", "/me", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = build_router(state.clone())
            .oneshot(empty_request("GET", "/me", Some("garbage")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = build_router(state)
            .oneshot(empty_request("GET", "/api/auth/verify", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_login_is_rate_limited() {
        let mut config = crate::test_support::test_config();
        config.auth_rate_limit = 2;
        let state = Arc::new(AppState::new(
            config,
            Arc::new(crate::store::memory::MemoryProfileStore::new()),
            None,
        ));

        let creds = json!({"Email": "rl@example.com", "Password": "whatever"});
        let mut statuses = Vec::new();
        for _ in 0..3 {
            let response = build_router(state.clone())
                .oneshot(json_request("POST", "/api/login", None, creds.clone()))
                .await
                .unwrap();
            statuses.push(response.status());
        }
        assert_eq!(
            statuses,
            vec![
                StatusCode::UNAUTHORIZED,
                StatusCode::UNAUTHORIZED,
                StatusCode::TOO_MANY_REQUESTS
            ]
        );
    }

    #[test]
    fn test_token_round_trip() {
        let account = Account {
            id: 7,
            email: "t@example.com".into(),
            password_hash: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let token = generate_jwt_token(&account, "s3cret", 1).unwrap();
        let claims = verify_jwt_token(&token, "s3cret").unwrap();
        assert_eq!(claims.account_id(), Some(7));
        assert!(verify_jwt_token(&token, "other").is_err());
    }
}
