// src/store/mod.rs
//! Account and profile persistence.
//!
//! `PgProfileStore` is the production backend; `MemoryProfileStore` keeps the same
//! contract in process and backs the router tests and database-less development.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::auth::Account;
use crate::models::profile::{Profile, ProfileUpdate};

pub mod memory;
pub mod postgres;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Inserts a new account. Fails with `Conflict` when the email is taken.
    async fn create_account(&self, email: &str, password_hash: &str) -> StoreResult<Account>;

    async fn find_account_by_email(&self, email: &str) -> StoreResult<Option<Account>>;

    async fn find_account(&self, id: i32) -> StoreResult<Option<Account>>;

    /// Atomic insert-or-update keyed on email. Fields absent from `update` keep their
    /// stored value; the returned row is the one now stored.
    async fn upsert_profile(&self, email: &str, update: &ProfileUpdate) -> StoreResult<Profile>;

    /// Atomic insert-or-replace keyed on email. Every field takes the value in
    /// `details`, so `None` clears what was stored.
    async fn replace_profile(&self, email: &str, details: &ProfileUpdate) -> StoreResult<Profile>;

    async fn profile_for_account(&self, account_id: i32) -> StoreResult<Option<Profile>>;

    async fn profile_for_email(&self, email: &str) -> StoreResult<Option<Profile>>;

    /// Partial update of the profile owned by `account_id`, creating the row if the
    /// account has none yet.
    async fn update_profile(&self, account_id: i32, update: &ProfileUpdate) -> StoreResult<Profile> {
        let account = self
            .find_account(account_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("Account {} not found", account_id)))?;
        self.upsert_profile(&account.email, update).await
    }

    async fn ping(&self) -> StoreResult<()>;
}

/// Emails are compared case-insensitively and without surrounding whitespace.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
