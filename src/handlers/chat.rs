// src/handlers/chat.rs
use crate::dispatcher::{ChatBackend, DispatchRequest};
use crate::error::ApiError;
use crate::handlers::auth::caller_id;
use crate::middleware::auth::auth_middleware;
use crate::models::auth::Claims;
use crate::models::chat::{
    ChatHistoryResponse, ChatMessage, ChatRequest, ChatResponse, ClearConversationRequest,
};
use crate::AppState;
use axum::{
    extract::{Extension, Path},
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::json;
use std::sync::Arc;

pub fn chat_routes() -> Router {
    Router::new()
        .route("/api/chat", post(send_message))
        .route("/api/chat/history/:session_id", get(get_chat_history))
        .route("/api/chat/clear", post(clear_conversation))
        .layer(axum::middleware::from_fn(auth_middleware))
}

fn backend(state: &AppState) -> Result<&Arc<dyn ChatBackend>, ApiError> {
    state
        .chat_backend
        .as_ref()
        .ok_or_else(|| ApiError::Unavailable("Chat backend is not configured".to_string()))
}

async fn send_message(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let owner = caller_id(&claims)?;
    let query = payload.query.trim();
    if query.is_empty() {
        return Err(ApiError::BadRequest("Query must not be empty".to_string()));
    }

    if let Some(session_id) = payload.session_id.as_deref() {
        if matches!(state.conversations.owner_of(session_id).await, Some(o) if o != owner) {
            return Err(ApiError::Forbidden("Unknown chat session".to_string()));
        }
    }

    let backend = backend(&state)?;
    let question = ChatMessage::user(query);
    let request = DispatchRequest::new(query, payload.mode, payload.session_id.clone())
        .with_urls(payload.urls);

    tracing::info!(
        account_id = owner,
        mode = %payload.mode,
        session_id = ?payload.session_id,
        "💬 chat request"
    );
    let reply = backend.dispatch(&request).await?;

    let recorded = state
        .conversations
        .record_turn(
            owner,
            &reply.session_id,
            question,
            ChatMessage::assistant(reply.answer.clone()),
        )
        .await;
    // The backend handed back a session another account already holds
    if !recorded {
        tracing::warn!(
            account_id = owner,
            session_id = %reply.session_id,
            "backend reply landed on a foreign chat session"
        );
        return Err(ApiError::Forbidden("Unknown chat session".to_string()));
    }

    Ok(Json(ChatResponse {
        answer: reply.answer,
        session_id: reply.session_id,
        sources: reply.sources,
    }))
}

async fn get_chat_history(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<String>,
) -> Result<Json<ChatHistoryResponse>, ApiError> {
    let owner = caller_id(&claims)?;
    let messages = state
        .conversations
        .history(owner, &session_id)
        .await
        .ok_or_else(|| ApiError::NotFound("Chat session not found".to_string()))?;

    Ok(Json(ChatHistoryResponse {
        session_id,
        messages,
    }))
}

async fn clear_conversation(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ClearConversationRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let owner = caller_id(&claims)?;
    if state.conversations.owner_of(&payload.session_id).await != Some(owner) {
        return Err(ApiError::NotFound("Chat session not found".to_string()));
    }

    backend(&state)?
        .clear_conversation(&payload.session_id, payload.conversation_name.as_deref())
        .await?;
    state.conversations.remove(owner, &payload.session_id).await;

    Ok(Json(json!({
        "success": true,
        "message": "Conversation cleared"
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_router;
    use crate::dispatcher::{DispatchError, DispatchReply};
    use crate::test_support::{body_json, empty_request, json_request, test_state};
    use async_trait::async_trait;
    use axum::http::StatusCode;
    use std::sync::Mutex;
    use tower::ServiceExt;

    /// Answers by echoing the query; mints `session-N` when no session id is supplied.
    #[derive(Default)]
    struct EchoBackend {
        requests: Mutex<Vec<DispatchRequest>>,
        fail: bool,
        fixed_session: Option<String>,
    }

    #[async_trait]
    impl ChatBackend for EchoBackend {
        async fn dispatch(&self, request: &DispatchRequest) -> Result<DispatchReply, DispatchError> {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request.clone());
            if self.fail {
                return Err(DispatchError::Status {
                    status: 500,
                    message: "boom".into(),
                });
            }
            Ok(DispatchReply {
                answer: format!("echo: {}", request.query),
                session_id: request
                    .session_id
                    .clone()
                    .or_else(|| self.fixed_session.clone())
                    .unwrap_or_else(|| format!("session-{}", requests.len())),
                sources: Vec::new(),
            })
        }

        async fn clear_conversation(&self, _: &str, _: Option<&str>) -> Result<(), DispatchError> {
            Ok(())
        }

        fn describe(&self) -> String {
            "echo".into()
        }
    }

    async fn token_for(state: &Arc<AppState>, email: &str) -> String {
        let response = build_router(state.clone())
            .oneshot(json_request(
                "POST",
                "/api/register",
                None,
                json!({"Email": email, "Password": "secret-pass"}),
            ))
            .await
            .unwrap();
        body_json(response).await["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_chat_round_trip_records_history() {
        let backend = Arc::new(EchoBackend::default());
        let state = test_state(Some(backend.clone()));
        let token = token_for(&state, "chat@example.com").await;

        let response = build_router(state.clone())
            .oneshot(json_request(
                "POST",
                "/api/chat",
                Some(&token),
                json!({"query": "What is HbA1c?", "mode": "rag"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let first = body_json(response).await;
        let session_id = first["session_id"].as_str().unwrap().to_string();
        assert_eq!(first["answer"], "echo: What is HbA1c?");

        let response = build_router(state.clone())
            .oneshot(json_request(
                "POST",
                "/api/chat",
                Some(&token),
                json!({"query": "Thanks", "session_id": session_id}),
            ))
            .await
            .unwrap();
        assert_eq!(body_json(response).await["session_id"], session_id.as_str());
        assert_eq!(
            backend.requests.lock().unwrap()[1].session_id.as_deref(),
            Some(session_id.as_str())
        );

        let response = build_router(state.clone())
            .oneshot(empty_request(
                "GET",
                &format!("/api/chat/history/{session_id}"),
                Some(&token),
            ))
            .await
            .unwrap();
        let history = body_json(response).await;
        let messages = history["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0]["sender"], "user");
        assert_eq!(messages[1]["sender"], "assistant");

        let other = token_for(&state, "other@example.com").await;
        let response = build_router(state.clone())
            .oneshot(empty_request(
                "GET",
                &format!("/api/chat/history/{session_id}"),
                Some(&other),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = build_router(state.clone())
            .oneshot(json_request(
                "POST",
                "/api/chat",
                Some(&other),
                json!({"query": "peek", "session_id": session_id}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = build_router(state.clone())
            .oneshot(json_request(
                "POST",
                "/api/chat/clear",
                Some(&token),
                json!({"session_id": session_id}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(state.conversations.len().await, 0);
    }

    #[tokio::test]
    async fn test_chat_errors() {
        let state = test_state(None);
        let token = token_for(&state, "none@example.com").await;
        let response = build_router(state.clone())
            .oneshot(json_request("POST", "/api/chat", Some(&token), json!({"query": "hi"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let response = build_router(state)
            .oneshot(json_request("POST", "/api/chat", Some(&token), json!({"query": "   "})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let failing = Arc::new(EchoBackend {
            fail: true,
            ..Default::default()
        });
        let state = test_state(Some(failing));
        let token = token_for(&state, "fail@example.com").await;
        let response = build_router(state.clone())
            .oneshot(json_request("POST", "/api/chat", Some(&token), json!({"query": "hi"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(state.conversations.len().await, 0);
    }

    #[tokio::test]
    async fn test_reply_on_foreign_session_is_refused() {
        let backend = Arc::new(EchoBackend {
            fixed_session: Some("shared".into()),
            ..Default::default()
        });
        let state = test_state(Some(backend));
        let first = token_for(&state, "first@example.com").await;
        let second = token_for(&state, "second@example.com").await;

        let response = build_router(state.clone())
            .oneshot(json_request("POST", "/api/chat", Some(&first), json!({"query": "hi"})))
            .await
            .unwrap();
        assert_eq!(body_json(response).await["session_id"], "shared");

        let response = build_router(state.clone())
            .oneshot(json_request("POST", "/api/chat", Some(&second), json!({"query": "hello"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = build_router(state)
            .oneshot(empty_request("GET", "/api/chat/history/shared", Some(&first)))
            .await
            .unwrap();
        let history = body_json(response).await;
        assert_eq!(history["messages"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_chat_requires_token() {
        let state = test_state(Some(Arc::new(EchoBackend::default())));
        let response = build_router(state)
            .oneshot(json_request("POST", "/api/chat", None, json!({"query": "hi"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
