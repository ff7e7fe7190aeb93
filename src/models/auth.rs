use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::profile::Profile;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Account {
    pub id: i32,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Credentials as posted by the login and register screens (`{Email, Password}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub success: bool,
    pub message: String,
    pub id: i32,
    pub email: String,
    pub token: String,
}

/// Successful login body: the account id, the stored profile fields and a bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
    pub id: i32,
    pub email: String,
    pub patient_name: Option<String>,
    pub prescription: Option<String>,
    pub diagnosis: Option<String>,
    pub notes: Option<String>,
    pub phone_number: Option<String>,
    pub user_group: Option<String>,
    pub token: String,
}

impl LoginResponse {
    pub fn new(account: &Account, profile: Option<Profile>, token: String) -> Self {
        let profile = profile.unwrap_or_default();
        LoginResponse {
            success: true,
            message: "Login successful".to_string(),
            id: account.id,
            email: account.email.clone(),
            patient_name: profile.username,
            prescription: profile.prescription,
            diagnosis: profile.diagnosis,
            notes: profile.notes,
            phone_number: profile.phone,
            user_group: profile.user_group,
            token,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // account id
    pub email: String,
    pub exp: usize,
    pub iat: usize,
}

impl Claims {
    pub fn account_id(&self) -> Option<i32> {
        self.sub.parse().ok()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub valid: bool,
    pub account_id: i32,
    pub email: String,
    pub exp: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MeResponse {
    pub id: i32,
    pub email: String,
}
