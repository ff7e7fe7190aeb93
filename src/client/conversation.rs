// src/client/conversation.rs
//! The chat thread on screen plus the threads the user has set aside this session.

use chrono::{DateTime, Utc};

use crate::dispatcher::{ChatBackend, DispatchError, DispatchRequest};
use crate::models::chat::{ChatMessage, ChatMode, Sender};

const TITLE_CHARS: usize = 30;

#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
    session_id: Option<String>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sends one user turn and appends the reply.
    ///
    /// Blank input is ignored and yields `Ok(None)`. When the backend fails the
    /// user's message stays in the thread so it can be resent.
    pub async fn send(
        &mut self,
        backend: &dyn ChatBackend,
        text: &str,
        mode: ChatMode,
        urls: Vec<String>,
    ) -> Result<Option<&ChatMessage>, DispatchError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }

        self.messages.push(ChatMessage::user(text));
        let request = DispatchRequest::new(text, mode, self.session_id.clone()).with_urls(urls);
        let reply = backend.dispatch(&request).await?;

        self.session_id = Some(reply.session_id);
        self.messages.push(ChatMessage::assistant(reply.answer));
        Ok(self.messages.last())
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// First user message, shortened for the saved-chats list.
    pub fn title(&self) -> String {
        let Some(first) = self.messages.iter().find(|m| m.sender == Sender::User) else {
            return "New Chat".to_string();
        };
        if first.text.chars().count() > TITLE_CHARS {
            let head: String = first.text.chars().take(TITLE_CHARS).collect();
            format!("{head}...")
        } else {
            first.text.clone()
        }
    }
}

#[derive(Debug, Clone)]
pub struct SavedChat {
    pub id: String,
    pub title: String,
    pub saved_at: DateTime<Utc>,
    conversation: Conversation,
}

impl SavedChat {
    pub fn messages(&self) -> &[ChatMessage] {
        self.conversation.messages()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateBucket {
    Today,
    Yesterday,
    Older,
}

impl DateBucket {
    fn of(saved_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        match (now.date_naive() - saved_at.date_naive()).num_days() {
            d if d <= 0 => DateBucket::Today,
            1 => DateBucket::Yesterday,
            _ => DateBucket::Older,
        }
    }
}

impl std::fmt::Display for DateBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateBucket::Today => write!(f, "Today"),
            DateBucket::Yesterday => write!(f, "Yesterday"),
            DateBucket::Older => write!(f, "Older"),
        }
    }
}

/// Client-only list of conversations; nothing here reaches the server.
#[derive(Debug, Default)]
pub struct ChatHistory {
    current: Conversation,
    saved: Vec<SavedChat>,
}

impl ChatHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> &Conversation {
        &self.current
    }

    pub fn current_mut(&mut self) -> &mut Conversation {
        &mut self.current
    }

    pub fn saved(&self) -> &[SavedChat] {
        &self.saved
    }

    fn stash_current(&mut self) {
        let conversation = std::mem::take(&mut self.current);
        if conversation.is_empty() {
            return;
        }
        let id = uuid::Uuid::new_v4().simple().to_string()[..9].to_string();
        self.saved.insert(
            0,
            SavedChat {
                id,
                title: conversation.title(),
                saved_at: Utc::now(),
                conversation,
            },
        );
    }

    /// Sets the current thread aside (if it has messages) and starts an empty one.
    pub fn new_chat(&mut self) {
        self.stash_current();
    }

    /// Swaps a saved thread back in. Returns false for an unknown id.
    pub fn load(&mut self, id: &str) -> bool {
        let Some(pos) = self.saved.iter().position(|c| c.id == id) else {
            return false;
        };
        let chosen = self.saved.remove(pos);
        self.stash_current();
        self.current = chosen.conversation;
        true
    }

    pub fn grouped(&self, now: DateTime<Utc>) -> Vec<(DateBucket, Vec<&SavedChat>)> {
        [DateBucket::Today, DateBucket::Yesterday, DateBucket::Older]
            .into_iter()
            .map(|bucket| {
                let chats = self
                    .saved
                    .iter()
                    .filter(|c| DateBucket::of(c.saved_at, now) == bucket)
                    .collect::<Vec<_>>();
                (bucket, chats)
            })
            .filter(|(_, chats)| !chats.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::DispatchReply;
    use async_trait::async_trait;
    use chrono::Duration;
    use std::sync::Mutex;

    #[derive(Default)]
    struct ScriptedBackend {
        seen: Mutex<Vec<Option<String>>>,
        fail: bool,
    }

    #[async_trait]
    impl ChatBackend for ScriptedBackend {
        async fn dispatch(&self, request: &DispatchRequest) -> Result<DispatchReply, DispatchError> {
            self.seen.lock().unwrap().push(request.session_id.clone());
            if self.fail {
                return Err(DispatchError::MalformedBody("nope".into()));
            }
            Ok(DispatchReply {
                answer: format!("re: {}", request.query),
                session_id: request.session_id.clone().unwrap_or_else(|| "s-1".into()),
                sources: Vec::new(),
            })
        }

        async fn clear_conversation(&self, _: &str, _: Option<&str>) -> Result<(), DispatchError> {
            Ok(())
        }

        fn describe(&self) -> String {
            "scripted".into()
        }
    }

    #[tokio::test]
    async fn test_send_chains_session_id() {
        let backend = ScriptedBackend::default();
        let mut chat = Conversation::new();

        assert!(chat.send(&backend, "   ", ChatMode::Rag, vec![]).await.unwrap().is_none());
        assert!(chat.is_empty());

        let reply = chat.send(&backend, "hello", ChatMode::Rag, vec![]).await.unwrap();
        assert_eq!(reply.unwrap().text, "re: hello");
        chat.send(&backend, "again", ChatMode::Rag, vec![]).await.unwrap();

        assert_eq!(chat.session_id(), Some("s-1"));
        assert_eq!(
            *backend.seen.lock().unwrap(),
            vec![None, Some("s-1".to_string())]
        );
        assert_eq!(chat.messages().len(), 4);
    }

    #[tokio::test]
    async fn test_failed_send_keeps_user_message() {
        let backend = ScriptedBackend {
            fail: true,
            ..Default::default()
        };
        let mut chat = Conversation::new();
        assert!(chat.send(&backend, "hello", ChatMode::Browser, vec![]).await.is_err());
        assert_eq!(chat.messages().len(), 1);
        assert_eq!(chat.messages()[0].sender, Sender::User);
        assert_eq!(chat.session_id(), None);
    }

    #[tokio::test]
    async fn test_new_chat_and_load_swap_threads() {
        let backend = ScriptedBackend::default();
        let mut history = ChatHistory::new();

        history.new_chat();
        assert!(history.saved().is_empty());

        let long = "What does my latest blood test actually say about me?";
        history
            .current_mut()
            .send(&backend, long, ChatMode::Rag, vec![])
            .await
            .unwrap();
        history.new_chat();
        assert!(history.current().is_empty());
        assert_eq!(history.saved().len(), 1);
        assert_eq!(history.saved()[0].title, "What does my latest blood test...");
        assert_eq!(history.saved()[0].messages().len(), 2);

        history
            .current_mut()
            .send(&backend, "short one", ChatMode::Rag, vec![])
            .await
            .unwrap();
        let first_id = history.saved()[0].id.clone();
        assert!(history.load(&first_id));
        assert_eq!(history.current().messages()[0].text, long);
        assert_eq!(history.saved().len(), 1);
        assert_eq!(history.saved()[0].title, "short one");

        assert!(!history.load("missing"));
    }

    #[tokio::test]
    async fn test_grouped_by_day() {
        let backend = ScriptedBackend::default();
        let mut history = ChatHistory::new();
        history
            .current_mut()
            .send(&backend, "hi", ChatMode::Rag, vec![])
            .await
            .unwrap();
        history.new_chat();

        let saved_at = history.saved()[0].saved_at;
        let groups = history.grouped(saved_at);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].0, DateBucket::Today);

        let groups = history.grouped(saved_at + Duration::days(1));
        assert_eq!(groups[0].0, DateBucket::Yesterday);

        let groups = history.grouped(saved_at + Duration::days(5));
        assert_eq!(groups[0].0, DateBucket::Older);
        assert_eq!(groups[0].0.to_string(), "Older");
    }
}
