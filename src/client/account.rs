// src/client/account.rs
use serde::{Deserialize, Serialize};

use crate::client::storage::{
    self, KeyValueStore, StorageError, ACCOUNT_DETAILS_KEY, SYSTEM_PROMPT_KEY, USER_ID_KEY,
};
use crate::models::auth::LoginResponse;
use crate::prompt::PromptFields;

/// What the screens remember about the signed-in account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountDetails {
    pub email: String,
    #[serde(default)]
    pub patient_name: Option<String>,
    #[serde(default)]
    pub prescription: Option<String>,
    #[serde(default)]
    pub diagnosis: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub user_group: Option<String>,
}

impl From<&LoginResponse> for AccountDetails {
    fn from(login: &LoginResponse) -> Self {
        AccountDetails {
            email: login.email.clone(),
            patient_name: login.patient_name.clone(),
            prescription: login.prescription.clone(),
            diagnosis: login.diagnosis.clone(),
            notes: login.notes.clone(),
            phone_number: login.phone_number.clone(),
            user_group: login.user_group.clone(),
        }
    }
}

impl From<&AccountDetails> for PromptFields {
    fn from(details: &AccountDetails) -> Self {
        PromptFields {
            patient_name: details.patient_name.clone(),
            diagnosis: details.diagnosis.clone(),
            prescription: details.prescription.clone(),
            appointment: None,
            notes: details.notes.clone(),
        }
    }
}

// Stored under `accountDetails`: the token travels with the details.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredAccount {
    token: String,
    #[serde(flatten)]
    details: AccountDetails,
}

#[derive(Debug, Clone)]
struct Session {
    token: String,
    user_id: i32,
    details: AccountDetails,
}

/// The signed-in identity, kept in sync with the backing store.
pub struct AccountContext<S: KeyValueStore> {
    store: S,
    session: Option<Session>,
}

impl<S: KeyValueStore> AccountContext<S> {
    /// Rebuilds the context from whatever the store holds. Both keys must be
    /// present for the session to count as signed in.
    pub fn restore(store: S) -> Self {
        let stored: Option<StoredAccount> = storage::load(&store, ACCOUNT_DETAILS_KEY);
        let user_id: Option<i32> = storage::load(&store, USER_ID_KEY);

        let session = match (stored, user_id) {
            (Some(stored), Some(user_id)) => Some(Session {
                token: stored.token,
                user_id,
                details: stored.details,
            }),
            (None, None) => None,
            _ => {
                tracing::warn!("incomplete stored account, starting signed out");
                None
            }
        };

        Self { store, session }
    }

    pub fn login(
        &mut self,
        token: impl Into<String>,
        user_id: i32,
        details: AccountDetails,
    ) -> Result<(), StorageError> {
        let stored = StoredAccount {
            token: token.into(),
            details,
        };
        storage::save(&mut self.store, ACCOUNT_DETAILS_KEY, &stored)?;
        storage::save(&mut self.store, USER_ID_KEY, &user_id)?;

        self.session = Some(Session {
            token: stored.token,
            user_id,
            details: stored.details,
        });
        Ok(())
    }

    /// Replaces the remembered details, e.g. after the profile form is saved.
    pub fn update_details(&mut self, details: AccountDetails) -> Result<(), StorageError> {
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        let stored = StoredAccount {
            token: session.token.clone(),
            details,
        };
        storage::save(&mut self.store, ACCOUNT_DETAILS_KEY, &stored)?;
        session.details = stored.details;
        Ok(())
    }

    pub fn logout(&mut self) -> Result<(), StorageError> {
        self.session = None;
        self.store.remove(ACCOUNT_DETAILS_KEY)?;
        self.store.remove(USER_ID_KEY)?;
        self.store.remove(SYSTEM_PROMPT_KEY)?;
        Ok(())
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    pub fn user_id(&self) -> Option<i32> {
        self.session.as_ref().map(|s| s.user_id)
    }

    pub fn token(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.token.as_str())
    }

    pub fn details(&self) -> Option<&AccountDetails> {
        self.session.as_ref().map(|s| &s.details)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::storage::{FileStore, MemoryStore};

    fn jane() -> AccountDetails {
        AccountDetails {
            email: "jane@example.com".into(),
            patient_name: Some("Jane".into()),
            diagnosis: Some("Type 2 Diabetes".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_identity_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("local.json");

        let mut ctx = AccountContext::restore(FileStore::open(&path).unwrap());
        assert!(!ctx.is_authenticated());
        ctx.login("tok-123", 7, jane()).unwrap();
        drop(ctx);

        let ctx = AccountContext::restore(FileStore::open(&path).unwrap());
        assert!(ctx.is_authenticated());
        assert_eq!(ctx.user_id(), Some(7));
        assert_eq!(ctx.token(), Some("tok-123"));
        assert_eq!(ctx.details(), Some(&jane()));
    }

    #[test]
    fn test_logout_clears_keys() {
        let mut store = MemoryStore::new();
        store.set(SYSTEM_PROMPT_KEY, "cached".into()).unwrap();
        let mut ctx = AccountContext::restore(store);
        ctx.login("tok", 1, jane()).unwrap();
        assert!(ctx.store().get(ACCOUNT_DETAILS_KEY).is_some());

        ctx.logout().unwrap();
        assert!(!ctx.is_authenticated());
        assert_eq!(ctx.token(), None);
        let store = ctx.into_store();
        assert_eq!(store.get(ACCOUNT_DETAILS_KEY), None);
        assert_eq!(store.get(USER_ID_KEY), None);
        assert_eq!(store.get(SYSTEM_PROMPT_KEY), None);
    }

    #[test]
    fn test_partial_store_restores_signed_out() {
        let mut store = MemoryStore::new();
        storage::save(&mut store, USER_ID_KEY, &3).unwrap();
        let ctx = AccountContext::restore(store);
        assert!(!ctx.is_authenticated());
        assert_eq!(ctx.user_id(), None);
    }

    #[test]
    fn test_details_from_login_response() {
        let body = serde_json::json!({
            "success": true,
            "message": "Login successful",
            "id": 5,
            "email": "jane@example.com",
            "patient_name": "Jane",
            "prescription": null,
            "diagnosis": "Type 2 Diabetes",
            "notes": null,
            "phone_number": null,
            "user_group": null,
            "token": "abc"
        });
        let login: LoginResponse = serde_json::from_value(body).unwrap();
        assert_eq!(AccountDetails::from(&login), jane());
    }
}
