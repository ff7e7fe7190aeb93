// src/store/memory.rs
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{normalize_email, ProfileStore, StoreError, StoreResult};
use crate::models::auth::Account;
use crate::models::profile::{Profile, ProfileUpdate};

#[derive(Default)]
struct Tables {
    accounts: Vec<Account>,
    // keyed by normalized email
    profiles: HashMap<String, Profile>,
    next_profile_id: i32,
}

/// Process-local store with the same upsert semantics as the Postgres tables.
#[derive(Default)]
pub struct MemoryProfileStore {
    tables: RwLock<Tables>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn profile_count(&self) -> usize {
        self.tables.read().await.profiles.len()
    }

    // Insert-or-update under one write lock, mirroring `ON CONFLICT (email)`.
    async fn write_profile(
        &self,
        email: &str,
        fields: &ProfileUpdate,
        write: fn(&ProfileUpdate, &mut Profile),
    ) -> StoreResult<Profile> {
        let email = normalize_email(email);
        let mut tables = self.tables.write().await;
        let account_id = tables
            .accounts
            .iter()
            .find(|a| a.email == email)
            .map(|a| a.id);

        if !tables.profiles.contains_key(&email) {
            tables.next_profile_id += 1;
            let profile = Profile {
                id: tables.next_profile_id,
                email: email.clone(),
                ..Default::default()
            };
            tables.profiles.insert(email.clone(), profile);
        }

        let profile = tables
            .profiles
            .get_mut(&email)
            .ok_or_else(|| StoreError::NotFound(format!("Profile for {} not found", email)))?;
        if profile.account_id.is_none() {
            profile.account_id = account_id;
        }
        write(fields, profile);
        profile.updated_at = Some(Utc::now());

        Ok(profile.clone())
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn create_account(&self, email: &str, password_hash: &str) -> StoreResult<Account> {
        let email = normalize_email(email);
        let mut tables = self.tables.write().await;
        if tables.accounts.iter().any(|a| a.email == email) {
            return Err(StoreError::Conflict(
                "An account with this email already exists".to_string(),
            ));
        }

        let now = Utc::now();
        let account = Account {
            id: tables.accounts.len() as i32 + 1,
            email: email.clone(),
            password_hash: password_hash.to_string(),
            created_at: now,
            updated_at: now,
        };
        tables.accounts.push(account.clone());

        if let Some(profile) = tables.profiles.get_mut(&email) {
            if profile.account_id.is_none() {
                profile.account_id = Some(account.id);
            }
        }

        Ok(account)
    }

    async fn find_account_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        let email = normalize_email(email);
        let tables = self.tables.read().await;
        Ok(tables.accounts.iter().find(|a| a.email == email).cloned())
    }

    async fn find_account(&self, id: i32) -> StoreResult<Option<Account>> {
        let tables = self.tables.read().await;
        Ok(tables.accounts.iter().find(|a| a.id == id).cloned())
    }

    async fn upsert_profile(&self, email: &str, update: &ProfileUpdate) -> StoreResult<Profile> {
        self.write_profile(email, update, ProfileUpdate::apply_to).await
    }

    async fn replace_profile(&self, email: &str, details: &ProfileUpdate) -> StoreResult<Profile> {
        self.write_profile(email, details, ProfileUpdate::overwrite).await
    }

    async fn profile_for_account(&self, account_id: i32) -> StoreResult<Option<Profile>> {
        let tables = self.tables.read().await;
        let email = tables
            .accounts
            .iter()
            .find(|a| a.id == account_id)
            .map(|a| a.email.clone());

        Ok(tables
            .profiles
            .values()
            .find(|p| p.account_id == Some(account_id) || Some(&p.email) == email.as_ref())
            .cloned())
    }

    async fn profile_for_email(&self, email: &str) -> StoreResult<Option<Profile>> {
        let tables = self.tables.read().await;
        Ok(tables.profiles.get(&normalize_email(email)).cloned())
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::contract;

    #[tokio::test]
    async fn test_memory_store_contract() {
        contract::run_all(&MemoryProfileStore::new()).await;
    }

    #[tokio::test]
    async fn test_upsert_and_replace_share_one_row_per_email() {
        let store = MemoryProfileStore::new();
        contract::upsert_twice_keeps_one_row(&store).await;
        assert_eq!(store.profile_count().await, 1);

        contract::replace_clears_missing_fields(&store).await;
        assert_eq!(store.profile_count().await, 2);
    }
}
