// src/client/system_prompt.rs
use crate::client::account::AccountDetails;
use crate::client::storage::{self, KeyValueStore, StorageError, SYSTEM_PROMPT_KEY};
use crate::prompt::{compose_system_prompt, PromptFields};

/// The prompt for the current browser session. Composed once from the account
/// details, then served from session storage until edited or cleared.
pub struct SystemPromptContext<S: KeyValueStore> {
    session: S,
}

impl<S: KeyValueStore> SystemPromptContext<S> {
    pub fn new(session: S) -> Self {
        Self { session }
    }

    pub fn prompt(&mut self, details: &AccountDetails) -> Result<String, StorageError> {
        if let Some(text) = storage::load::<_, String>(&self.session, SYSTEM_PROMPT_KEY) {
            return Ok(text);
        }
        let text = compose_system_prompt(&PromptFields::from(details));
        storage::save(&mut self.session, SYSTEM_PROMPT_KEY, &text)?;
        Ok(text)
    }

    pub fn set_override(&mut self, text: impl Into<String>) -> Result<(), StorageError> {
        let text: String = text.into();
        storage::save(&mut self.session, SYSTEM_PROMPT_KEY, &text)
    }

    /// Forgets the cached prompt so the next read recomposes it.
    pub fn clear(&mut self) -> Result<(), StorageError> {
        self.session.remove(SYSTEM_PROMPT_KEY)
    }
}
