//! Conversation endpoints: starting agent runs, polling, and SSE relay.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures::stream::Stream;
use optimonkey_app::{next_event, SessionContext, SessionEvent};
use optimonkey_domain::{ChatStatus, ConversationMessage, SessionId};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use super::{error_response, ApiError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PromptRequest {
    pub prompt: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StartResponse {
    pub session_id: String,
    pub status: ChatStatus,
}

#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    pub session_id: String,
    #[serde(default)]
    pub cursor: usize,
}

#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    pub messages: Vec<ConversationMessage>,
    pub cursor: usize,
    pub status: ChatStatus,
}

/// Looks up an existing session, or creates a fresh one when no id was sent.
pub async fn resolve_session(
    state: &AppState,
    session_id: Option<&str>,
) -> Result<Arc<SessionContext>, ApiError> {
    match session_id {
        Some(raw) => {
            let id = SessionId::parse(raw)
                .map_err(|e| error_response(StatusCode::BAD_REQUEST, e.to_string()))?;
            state
                .registry
                .get(&id)
                .await
                .map_err(|e| error_response(StatusCode::NOT_FOUND, e.to_string()))
        }
        None => Ok(state.registry.create().await),
    }
}

/// Requires an existing session; used by the read-side endpoints.
pub async fn require_session(
    state: &AppState,
    raw: &str,
) -> Result<Arc<SessionContext>, ApiError> {
    resolve_session(state, Some(raw)).await
}

async fn start(
    state: &AppState,
    session: Arc<SessionContext>,
    prompt: Option<String>,
) -> Result<Json<StartResponse>, ApiError> {
    if session.status().await == ChatStatus::Ongoing {
        return Err((
            StatusCode::CONFLICT,
            Json(json!({
                "status": "chat_ongoing",
                "session_id": session.id().into_string(),
            })),
        ));
    }
    info!(session_id = %session.id(), "Starting agent conversation");
    let response = StartResponse {
        session_id: session.id().into_string(),
        status: ChatStatus::Ongoing,
    };
    let _ = state.engine.spawn_conversation(session, prompt);
    Ok(Json(response))
}

/// POST /start-agents — runs the default cost-analysis task.
pub async fn start_agents(
    State(state): State<AppState>,
) -> Result<Json<StartResponse>, ApiError> {
    let session = state.registry.create().await;
    start(&state, session, None).await
}

/// POST /start-agents-with-prompt — runs a caller-supplied task.
pub async fn start_agents_with_prompt(
    State(state): State<AppState>,
    Json(request): Json<PromptRequest>,
) -> Result<Json<StartResponse>, ApiError> {
    let session = resolve_session(&state, request.session_id.as_deref()).await?;
    start(&state, session, Some(request.prompt)).await
}

/// POST /send-message — same as starting with a prompt, but reports a
/// conflict instead of queueing when the session is mid-conversation.
pub async fn send_message(
    State(state): State<AppState>,
    Json(request): Json<SendMessageRequest>,
) -> Result<Json<StartResponse>, ApiError> {
    let session = resolve_session(&state, request.session_id.as_deref()).await?;
    start(&state, session, Some(request.message)).await
}

/// GET /api/get-message — cursor-based polling over the transcript.
pub async fn get_message(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> Result<Json<MessagesResponse>, ApiError> {
    let session = require_session(&state, &query.session_id).await?;
    let (messages, cursor) = session.messages_from(query.cursor).await;
    Ok(Json(MessagesResponse {
        messages,
        cursor,
        status: session.status().await,
    }))
}

/// GET /api/stream-conversation — SSE relay. Replays the transcript from the
/// cursor, then follows the live stream until the conversation terminates or
/// goes idle.
pub async fn stream_conversation(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let session = require_session(&state, &query.session_id).await?;
    let mut cursor = query.cursor;

    let stream = async_stream::stream! {
        // Subscribe before draining the transcript; the receiver is only a
        // wakeup signal, the transcript is the source of truth, so nothing
        // is duplicated or lost in between.
        let mut receiver = session.subscribe();
        loop {
            let (messages, next) = session.messages_from(cursor).await;
            cursor = next;
            let mut finished = false;
            for message in messages {
                finished |= message.is_termination();
                if let Ok(event) = Event::default().json_data(&message) {
                    yield Ok(event);
                }
            }
            if finished {
                break;
            }
            match next_event(&mut receiver).await {
                SessionEvent::Message(_) => continue,
                SessionEvent::Idle | SessionEvent::Closed => break,
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
