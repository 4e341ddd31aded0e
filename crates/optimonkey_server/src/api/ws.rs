//! WebSocket relay: the bidirectional counterpart of the SSE endpoint.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use optimonkey_app::{next_event, SessionContext, SessionEvent};
use optimonkey_domain::{ChatStatus, ConversationMessage};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::api::conversation::resolve_session;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InboundMessage {
    message: String,
}

/// GET /ws/conversation — upgrades and relays the session stream. Inbound
/// text frames carry prompts; either `{"message": "..."}` or raw text.
pub async fn conversation_socket(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| async move {
        let session = match resolve_session(&state, query.session_id.as_deref()).await {
            Ok(session) => session,
            Err((status, body)) => {
                warn!(%status, "WebSocket session lookup failed");
                let mut socket = socket;
                let _ = socket.send(Message::text(body.0.to_string())).await;
                let _ = socket.close().await;
                return;
            }
        };
        relay(socket, state, session).await;
    })
}

async fn relay(socket: WebSocket, state: AppState, session: Arc<SessionContext>) {
    info!(session_id = %session.id(), "WebSocket relay opened");
    let (mut outbound, mut inbound) = socket.split();

    // Greet with the session id so reconnecting clients can resume.
    let greeting = json!({
        "session_id": session.id().into_string(),
        "status": session.status().await,
    });
    if outbound.send(Message::text(greeting.to_string())).await.is_err() {
        return;
    }

    // The receiver is only a wakeup; every frame sent to the client is read
    // from the transcript via the cursor, so a message published while the
    // backlog is being replayed goes out exactly once.
    let mut events = session.subscribe();
    let mut cursor = 0usize;

    'relay: loop {
        let (messages, next) = session.messages_from(cursor).await;
        cursor = next;
        for message in messages {
            let terminal = message.is_termination();
            if send_record(&mut outbound, &message).await.is_err() {
                break 'relay;
            }
            if terminal {
                debug!(session_id = %session.id(), "Conversation finished, closing socket");
                break 'relay;
            }
        }

        tokio::select! {
            event = next_event(&mut events) => match event {
                SessionEvent::Message(_) => continue,
                SessionEvent::Idle => {
                    if idle_disconnects(session.status().await) {
                        let notice = json!({"status": "timeout"});
                        let _ = outbound.send(Message::text(notice.to_string())).await;
                        break;
                    }
                }
                SessionEvent::Closed => break,
            },
            frame = inbound.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    handle_prompt(&state, &session, &mut outbound, text.as_str()).await;
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => continue,
                Some(Err(err)) => {
                    debug!(error = %err, "WebSocket receive error");
                    break;
                }
            },
        }
    }

    let _ = outbound.close().await;
    info!(session_id = %session.id(), "WebSocket relay closed");
}

/// The idle timeout guards against a wedged conversation; a connected client
/// that has not started one stays on the socket.
fn idle_disconnects(status: ChatStatus) -> bool {
    status == ChatStatus::Ongoing
}

async fn handle_prompt(
    state: &AppState,
    session: &Arc<SessionContext>,
    outbound: &mut (impl SinkExt<Message> + Unpin),
    text: &str,
) {
    let prompt = match serde_json::from_str::<InboundMessage>(text) {
        Ok(inbound) => inbound.message,
        Err(_) => text.to_string(),
    };
    if prompt.trim().is_empty() {
        return;
    }
    if session.status().await == ChatStatus::Ongoing {
        let notice = json!({"status": "chat_ongoing"});
        let _ = outbound.send(Message::text(notice.to_string())).await;
        return;
    }
    let _ = state
        .engine
        .spawn_conversation(session.clone(), Some(prompt));
}

async fn send_record(
    outbound: &mut (impl SinkExt<Message> + Unpin),
    message: &ConversationMessage,
) -> Result<(), ()> {
    let payload = serde_json::to_string(message).map_err(|_| ())?;
    outbound
        .send(Message::text(payload))
        .await
        .map_err(|_| ())
}
