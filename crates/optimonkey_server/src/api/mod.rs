use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::state::AppState;

pub mod conversation;
pub mod download;
pub mod ws;

pub type ApiError = (StatusCode, Json<Value>);

pub fn error_response(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(json!({ "error": message.into() })))
}

/// The full route table. Paths keep the shapes browser clients already use.
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/start-agents", post(conversation::start_agents))
        .route(
            "/start-agents-with-prompt",
            post(conversation::start_agents_with_prompt),
        )
        .route("/send-message", post(conversation::send_message))
        .route("/api/get-message", get(conversation::get_message))
        .route(
            "/api/stream-conversation",
            get(conversation::stream_conversation),
        )
        .route(
            "/download-recommendations",
            get(download::download_recommendations),
        )
        .route("/ws/conversation", get(ws::conversation_socket))
        .with_state(state)
}
