// src/client/api.rs
//! Typed client for the companion's own JSON API.

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::dispatcher::{extract_error_message, ChatBackend, DispatchError, DispatchReply, DispatchRequest};
use crate::models::auth::{Credentials, LoginResponse, RegisterResponse};
use crate::models::chat::{ChatRequest, ChatResponse, ClearConversationRequest};
use crate::models::profile::{Profile, ProfilePatch, ProfileUpdate};

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("malformed response body: {0}")]
    MalformedBody(String),
}

impl From<ClientError> for DispatchError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Transport(e) => DispatchError::Transport(e),
            ClientError::Status { status, message } => DispatchError::Status { status, message },
            ClientError::MalformedBody(m) => DispatchError::MalformedBody(m),
        }
    }
}

/// Profile reads and writes for one account.
#[async_trait]
pub trait ProfileApi: Send + Sync {
    async fn fetch_profile(&self, user_id: i32) -> Result<Profile, ClientError>;
    async fn update_profile(&self, user_id: i32, update: &ProfileUpdate) -> Result<Profile, ClientError>;
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    async fn send<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut request = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                message: extract_error_message(&text),
            });
        }
        serde_json::from_str(&text).map_err(|e| ClientError::MalformedBody(e.to_string()))
    }

    pub async fn register(&self, credentials: &Credentials) -> Result<RegisterResponse, ClientError> {
        self.send(Method::POST, "/api/register", Some(credentials)).await
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, ClientError> {
        self.send(Method::POST, "/api/login", Some(credentials)).await
    }

    pub async fn system_prompt(&self) -> Result<String, ClientError> {
        let body: serde_json::Value = self
            .send::<(), _>(Method::GET, "/api/system-prompt", None)
            .await?;
        body.get("system_prompt")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| ClientError::MalformedBody("missing system_prompt".to_string()))
    }
}

#[async_trait]
impl ProfileApi for ApiClient {
    async fn fetch_profile(&self, user_id: i32) -> Result<Profile, ClientError> {
        self.send::<(), _>(Method::GET, &format!("/profile?id={user_id}"), None)
            .await
    }

    async fn update_profile(&self, user_id: i32, update: &ProfileUpdate) -> Result<Profile, ClientError> {
        let patch = ProfilePatch {
            id: user_id,
            fields: update.clone(),
        };
        self.send(Method::PUT, "/profile", Some(&patch)).await
    }
}

/// Lets a client conversation talk to the server's `/api/chat` instead of the RAG
/// service directly.
#[async_trait]
impl ChatBackend for ApiClient {
    async fn dispatch(&self, request: &DispatchRequest) -> Result<DispatchReply, DispatchError> {
        let body = ChatRequest {
            query: request.query.clone(),
            mode: request.mode,
            session_id: request.session_id.clone(),
            urls: request.urls.clone(),
        };
        let reply: ChatResponse = self.send(Method::POST, "/api/chat", Some(&body)).await?;
        Ok(DispatchReply {
            answer: reply.answer,
            session_id: reply.session_id,
            sources: reply.sources,
        })
    }

    async fn clear_conversation(
        &self,
        session_id: &str,
        conversation_name: Option<&str>,
    ) -> Result<(), DispatchError> {
        let body = ClearConversationRequest {
            session_id: session_id.to_string(),
            conversation_name: conversation_name.map(str::to_string),
        };
        let _: serde_json::Value = self.send(Method::POST, "/api/chat/clear", Some(&body)).await?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("companion api at {}", self.base_url)
    }
}
