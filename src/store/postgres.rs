// src/store/postgres.rs
use async_trait::async_trait;
use sqlx::PgPool;

use super::{normalize_email, ProfileStore, StoreError, StoreResult};
use crate::models::auth::Account;
use crate::models::profile::{Profile, ProfileUpdate};

const PROFILE_COLUMNS: &str = "id, account_id, email, username, diagnosis, prescription, age, \
     gender, ethnicity, phone, notes, user_group, appointment, updated_at";

const EDITABLE_COLUMNS: [&str; 10] = [
    "username",
    "diagnosis",
    "prescription",
    "age",
    "gender",
    "ethnicity",
    "phone",
    "notes",
    "user_group",
    "appointment",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConflictPolicy {
    /// Null in the incoming row keeps the stored value.
    Merge,
    /// The incoming row wins column for column.
    Replace,
}

fn conflict_assignments(policy: ConflictPolicy) -> String {
    EDITABLE_COLUMNS
        .iter()
        .map(|col| match policy {
            ConflictPolicy::Merge => format!("{col} = COALESCE(EXCLUDED.{col}, profiles.{col})"),
            ConflictPolicy::Replace => format!("{col} = EXCLUDED.{col}"),
        })
        .collect::<Vec<_>>()
        .join(",\n                ")
}

#[derive(Debug, Clone)]
pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn write_profile(
        &self,
        email: &str,
        fields: &ProfileUpdate,
        policy: ConflictPolicy,
    ) -> StoreResult<Profile> {
        let sql = format!(
            "INSERT INTO profiles (email, account_id, username, diagnosis, prescription, age, gender,
                                   ethnicity, phone, notes, user_group, appointment, updated_at)
             VALUES ($1, (SELECT id FROM accounts WHERE email = $1), $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, NOW())
             ON CONFLICT (email) DO UPDATE SET
                account_id = COALESCE(profiles.account_id, EXCLUDED.account_id),
                {},
                updated_at = NOW()
             RETURNING {}",
            conflict_assignments(policy),
            PROFILE_COLUMNS
        );

        let profile = sqlx::query_as::<_, Profile>(&sql)
            .bind(normalize_email(email))
            .bind(&fields.username)
            .bind(&fields.diagnosis)
            .bind(&fields.prescription)
            .bind(fields.age)
            .bind(&fields.gender)
            .bind(&fields.ethnicity)
            .bind(&fields.phone)
            .bind(&fields.notes)
            .bind(&fields.user_group)
            .bind(&fields.appointment)
            .fetch_one(&self.pool)
            .await?;

        Ok(profile)
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn create_account(&self, email: &str, password_hash: &str) -> StoreResult<Account> {
        let email = normalize_email(email);
        let result = sqlx::query_as::<_, Account>(
            "INSERT INTO accounts (email, password_hash, created_at, updated_at)
             VALUES ($1, $2, NOW(), NOW())
             RETURNING id, email, password_hash, created_at, updated_at",
        )
        .bind(&email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await;

        let account = match result {
            Ok(account) => account,
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                return Err(StoreError::Conflict(
                    "An account with this email already exists".to_string(),
                ));
            }
            Err(e) => return Err(e.into()),
        };

        // Claim a profile row created before the account existed
        sqlx::query("UPDATE profiles SET account_id = $1 WHERE email = $2 AND account_id IS NULL")
            .bind(account.id)
            .bind(&email)
            .execute(&self.pool)
            .await?;

        Ok(account)
    }

    async fn find_account_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(
            "SELECT id, email, password_hash, created_at, updated_at FROM accounts WHERE email = $1",
        )
        .bind(normalize_email(email))
        .fetch_optional(&self.pool)
        .await?;
        Ok(account)
    }

    async fn find_account(&self, id: i32) -> StoreResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(
            "SELECT id, email, password_hash, created_at, updated_at FROM accounts WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(account)
    }

    async fn upsert_profile(&self, email: &str, update: &ProfileUpdate) -> StoreResult<Profile> {
        self.write_profile(email, update, ConflictPolicy::Merge).await
    }

    async fn replace_profile(&self, email: &str, details: &ProfileUpdate) -> StoreResult<Profile> {
        self.write_profile(email, details, ConflictPolicy::Replace).await
    }

    async fn profile_for_account(&self, account_id: i32) -> StoreResult<Option<Profile>> {
        let sql = format!(
            "SELECT {} FROM profiles
             WHERE account_id = $1 OR email = (SELECT email FROM accounts WHERE id = $1)
             LIMIT 1",
            PROFILE_COLUMNS
        );
        let profile = sqlx::query_as::<_, Profile>(&sql)
            .bind(account_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(profile)
    }

    async fn profile_for_email(&self, email: &str) -> StoreResult<Option<Profile>> {
        let sql = format!("SELECT {} FROM profiles WHERE email = $1", PROFILE_COLUMNS);
        let profile = sqlx::query_as::<_, Profile>(&sql)
            .bind(normalize_email(email))
            .fetch_optional(&self.pool)
            .await?;
        Ok(profile)
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
