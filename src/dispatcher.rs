// src/dispatcher.rs
//! Client for the external RAG service. One call is one request/response: no
//! streaming and no retries. The session id returned by the service is handed
//! back to the caller, which echoes it on the next turn.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

use crate::models::chat::ChatMode;

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("backend returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("malformed response body: {0}")]
    MalformedBody(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DispatchRequest {
    pub query: String,
    pub mode: ChatMode,
    pub session_id: Option<String>,
    pub urls: Vec<String>,
}

impl DispatchRequest {
    pub fn new(query: impl Into<String>, mode: ChatMode, session_id: Option<String>) -> Self {
        Self {
            query: query.into(),
            mode,
            session_id,
            urls: Vec::new(),
        }
    }

    pub fn with_urls(mut self, urls: Vec<String>) -> Self {
        self.urls = urls;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DispatchReply {
    pub answer: String,
    pub session_id: String,
    pub sources: Vec<HashMap<String, String>>,
}

/// Anything that can answer a chat turn.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn dispatch(&self, request: &DispatchRequest) -> Result<DispatchReply, DispatchError>;

    async fn clear_conversation(
        &self,
        session_id: &str,
        conversation_name: Option<&str>,
    ) -> Result<(), DispatchError>;

    fn describe(&self) -> String;
}

#[derive(Debug, Serialize)]
struct DatabaseRagBody<'a> {
    query: &'a str,
    session_id: Option<&'a str>,
    collection_name: &'a str,
}

#[derive(Debug, Serialize)]
struct BrowserRagBody<'a> {
    query: &'a str,
    session_id: Option<&'a str>,
    urls: &'a [String],
}

#[derive(Debug, Serialize)]
struct ClearBody<'a> {
    session_id: &'a str,
    conversation_name: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct RagResponse {
    answer: String,
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    source: Option<Vec<HashMap<String, String>>>,
}

#[derive(Debug, Clone)]
pub struct RagDispatcher {
    client: Client,
    base_url: String,
    collection_name: String,
}

impl RagDispatcher {
    pub fn new(
        base_url: impl Into<String>,
        collection_name: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, DispatchError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            collection_name: collection_name.into(),
        })
    }

    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<String, DispatchError> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(DispatchError::Status {
                status: status.as_u16(),
                message: extract_error_message(&text),
            });
        }
        Ok(text)
    }
}

#[async_trait]
impl ChatBackend for RagDispatcher {
    async fn dispatch(&self, request: &DispatchRequest) -> Result<DispatchReply, DispatchError> {
        let session_id = request.session_id.as_deref();
        tracing::debug!(
            mode = %request.mode,
            session_id = ?session_id,
            "dispatching chat request"
        );

        let text = match request.mode {
            ChatMode::Rag => {
                let body = DatabaseRagBody {
                    query: &request.query,
                    session_id,
                    collection_name: &self.collection_name,
                };
                self.post(request.mode.endpoint(), &body).await?
            }
            ChatMode::Browser => {
                let body = BrowserRagBody {
                    query: &request.query,
                    session_id,
                    urls: &request.urls,
                };
                self.post(request.mode.endpoint(), &body).await?
            }
        };

        let parsed: RagResponse = serde_json::from_str(&text)
            .map_err(|e| DispatchError::MalformedBody(e.to_string()))?;

        let session_id = parsed
            .session_id
            .filter(|s| !s.is_empty())
            .or_else(|| request.session_id.clone())
            .ok_or_else(|| DispatchError::MalformedBody("response carried no session_id".to_string()))?;

        Ok(DispatchReply {
            answer: parsed.answer,
            session_id,
            sources: parsed.source.unwrap_or_default(),
        })
    }

    async fn clear_conversation(
        &self,
        session_id: &str,
        conversation_name: Option<&str>,
    ) -> Result<(), DispatchError> {
        let body = ClearBody {
            session_id,
            conversation_name,
        };
        self.post("/clear-conversation", &body).await?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("rag service at {}", self.base_url)
    }
}

/// Pulls a human-readable message out of an error body (`detail`, `error` or
/// `message`), falling back to the raw text.
pub(crate) fn extract_error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["detail", "error", "message"] {
            if let Some(message) = value.get(key).and_then(|v| v.as_str()) {
                return message.to_string();
            }
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "no response body".to_string()
    } else {
        trimmed.chars().take(200).collect()
    }
}
