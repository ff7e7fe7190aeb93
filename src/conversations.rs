// src/conversations.rs
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::models::chat::ChatMessage;

#[derive(Debug, Clone)]
struct Transcript {
    owner: i32,
    messages: Vec<ChatMessage>,
}

/// In-process chat transcripts keyed by the backend's session id. Lost on restart.
#[derive(Debug, Default)]
pub struct ConversationRegistry {
    transcripts: RwLock<HashMap<String, Transcript>>,
}

impl ConversationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn owner_of(&self, session_id: &str) -> Option<i32> {
        self.transcripts
            .read()
            .await
            .get(session_id)
            .map(|t| t.owner)
    }

    /// Appends one question/answer pair. Returns false (and records nothing) when the
    /// session belongs to another account.
    pub async fn record_turn(
        &self,
        owner: i32,
        session_id: &str,
        question: ChatMessage,
        answer: ChatMessage,
    ) -> bool {
        let mut transcripts = self.transcripts.write().await;
        let transcript = transcripts
            .entry(session_id.to_string())
            .or_insert_with(|| Transcript {
                owner,
                messages: Vec::new(),
            });
        if transcript.owner != owner {
            tracing::warn!(session_id, owner, "refusing to record turn for foreign session");
            return false;
        }
        transcript.messages.push(question);
        transcript.messages.push(answer);
        true
    }

    pub async fn history(&self, owner: i32, session_id: &str) -> Option<Vec<ChatMessage>> {
        self.transcripts
            .read()
            .await
            .get(session_id)
            .filter(|t| t.owner == owner)
            .map(|t| t.messages.clone())
    }

    pub async fn remove(&self, owner: i32, session_id: &str) -> bool {
        let mut transcripts = self.transcripts.write().await;
        match transcripts.get(session_id) {
            Some(t) if t.owner == owner => {
                transcripts.remove(session_id);
                true
            }
            _ => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.transcripts.read().await.len()
    }
}
