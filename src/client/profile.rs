// src/client/profile.rs
use crate::client::api::{ClientError, ProfileApi};
use crate::models::profile::{Profile, ProfileUpdate};

/// The current account's profile as the screens see it.
///
/// A failed fetch does not leave the screens empty: the context falls back to
/// [`Profile::fallback`] and raises `is_fallback` alongside the error message.
pub struct ProfileContext<A: ProfileApi> {
    api: A,
    user_id: i32,
    profile: Profile,
    error: Option<String>,
    is_fallback: bool,
    loading: bool,
}

impl<A: ProfileApi> ProfileContext<A> {
    pub fn new(api: A, user_id: i32) -> Self {
        Self {
            api,
            user_id,
            profile: Profile::default(),
            error: None,
            is_fallback: false,
            loading: false,
        }
    }

    pub async fn refresh_profile(&mut self) -> &Profile {
        self.loading = true;
        let result = self.api.fetch_profile(self.user_id).await;
        self.loading = false;

        match result {
            Ok(profile) => {
                self.profile = profile;
                self.error = None;
                self.is_fallback = false;
            }
            Err(e) => {
                tracing::warn!(user_id = self.user_id, "profile fetch failed, using default: {}", e);
                self.profile = Profile::fallback();
                self.error = Some(e.to_string());
                self.is_fallback = true;
            }
        }
        &self.profile
    }

    /// Sends a partial record. Local state only changes when the server accepts it.
    pub async fn update_profile(&mut self, update: &ProfileUpdate) -> Result<&Profile, ClientError> {
        self.loading = true;
        let result = self.api.update_profile(self.user_id, update).await;
        self.loading = false;

        match result {
            Ok(profile) => {
                self.profile = profile;
                self.error = None;
                self.is_fallback = false;
                Ok(&self.profile)
            }
            Err(e) => {
                self.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_fallback(&self) -> bool {
        self.is_fallback
    }

    pub fn loading(&self) -> bool {
        self.loading
    }
}
