use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use optimonkey_domain::{ChatStatus, ConversationMessage, Error, Result, SessionId};
use tokio::sync::{broadcast, RwLock};
use tokio::time::{timeout, Instant};
use tracing::debug;

use crate::tools::SavedCsv;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Maximum time a relay waits for the next message before giving up on the
/// session. Matches the slowest expected agent turn with headroom.
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(120);

/// How long a finished session stays available for transcript reads and the
/// CSV download before it is evicted from the registry.
pub const SESSION_RETENTION: Duration = Duration::from_secs(60 * 60);

/// What a relay gets back when asking for the next conversation event.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Message(ConversationMessage),
    /// No message arrived within [`IDLE_TIMEOUT`].
    Idle,
    /// The chat loop dropped its sender; nothing more will arrive.
    Closed,
}

/// All state belonging to one conversation. Transports and the chat loop
/// share it through an [`Arc`]; the transcript is append-only.
#[derive(Debug)]
pub struct SessionContext {
    id: SessionId,
    status: RwLock<ChatStatus>,
    transcript: RwLock<Vec<ConversationMessage>>,
    events: broadcast::Sender<ConversationMessage>,
    recommendations: RwLock<Option<SavedCsv>>,
    finished_at: RwLock<Option<Instant>>,
}

impl SessionContext {
    pub fn new(id: SessionId) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            id,
            status: RwLock::new(ChatStatus::default()),
            transcript: RwLock::new(Vec::new()),
            events,
            recommendations: RwLock::new(None),
            finished_at: RwLock::new(None),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub async fn status(&self) -> ChatStatus {
        *self.status.read().await
    }

    pub async fn set_status(&self, status: ChatStatus) {
        debug!(session_id = %self.id, ?status, "Session status changed");
        *self.status.write().await = status;
        *self.finished_at.write().await = match status {
            ChatStatus::Ended | ChatStatus::Error => Some(Instant::now()),
            ChatStatus::Idle | ChatStatus::Ongoing => None,
        };
    }

    /// Whether the session finished longer than `retention` ago and no relay
    /// is attached anymore.
    pub async fn expired(&self, retention: Duration) -> bool {
        if self.events.receiver_count() > 0 {
            return false;
        }
        match *self.finished_at.read().await {
            Some(finished) => finished.elapsed() > retention,
            None => false,
        }
    }

    /// Appends a message to the transcript and fans it out to subscribers.
    /// Blank text messages are dropped; they carry nothing worth relaying.
    pub async fn publish(&self, message: ConversationMessage) {
        if message.is_blank() {
            return;
        }
        self.transcript.write().await.push(message.clone());
        // Send only fails when no relay is subscribed; the transcript still
        // has the message for late joiners.
        let _ = self.events.send(message);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConversationMessage> {
        self.events.subscribe()
    }

    /// Full transcript so far.
    pub async fn history(&self) -> Vec<ConversationMessage> {
        self.transcript.read().await.clone()
    }

    /// Messages appended at or after `cursor`, with the next cursor value.
    /// Lets polling clients resume without replaying the whole transcript.
    pub async fn messages_from(&self, cursor: usize) -> (Vec<ConversationMessage>, usize) {
        let transcript = self.transcript.read().await;
        let messages = transcript.get(cursor..).unwrap_or_default().to_vec();
        (messages, transcript.len())
    }

    pub async fn set_recommendations(&self, saved: SavedCsv) {
        *self.recommendations.write().await = Some(saved);
    }

    pub async fn recommendations(&self) -> Option<SavedCsv> {
        self.recommendations.read().await.clone()
    }
}

/// Waits for the next event on a subscribed receiver, bounded by
/// [`IDLE_TIMEOUT`]. Lagged receivers skip ahead instead of erroring; the
/// transcript remains the source of truth for anything missed.
pub async fn next_event(
    receiver: &mut broadcast::Receiver<ConversationMessage>,
) -> SessionEvent {
    loop {
        match timeout(IDLE_TIMEOUT, receiver.recv()).await {
            Ok(Ok(message)) => return SessionEvent::Message(message),
            Ok(Err(broadcast::error::RecvError::Lagged(skipped))) => {
                debug!(skipped, "Relay lagged behind the conversation stream");
                continue;
            }
            Ok(Err(broadcast::error::RecvError::Closed)) => return SessionEvent::Closed,
            Err(_) => return SessionEvent::Idle,
        }
    }
}

/// Registry of live sessions keyed by id. One instance per server process;
/// each session keeps its own state so concurrent conversations never
/// interfere.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, Arc<SessionContext>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a fresh session and returns its context.
    pub async fn create(&self) -> Arc<SessionContext> {
        let id = SessionId::generate();
        let context = Arc::new(SessionContext::new(id));
        self.sessions.write().await.insert(id, context.clone());
        context
    }

    pub async fn get(&self, id: &SessionId) -> Result<Arc<SessionContext>> {
        self.sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| Error::SessionNotFound(id.into_string()))
    }

    pub async fn remove(&self, id: &SessionId) {
        self.sessions.write().await.remove(id);
    }

    /// Evicts sessions that finished longer than `retention` ago and have no
    /// subscribers left. Returns how many were removed.
    pub async fn prune_expired(&self, retention: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let mut expired = Vec::new();
        for (id, session) in sessions.iter() {
            if session.expired(retention).await {
                expired.push(*id);
            }
        }
        for id in &expired {
            debug!(session_id = %id, "Evicting finished session");
            sessions.remove(id);
        }
        expired.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use optimonkey_domain::{ChatRole, MessageKind};
    use pretty_assertions::assert_eq;

    use super::*;

    #[tokio::test]
    async fn test_publish_appends_and_fans_out() {
        let session = SessionContext::new(SessionId::generate());
        let mut receiver = session.subscribe();

        let fixture = ConversationMessage::text(ChatRole::Agent, "Planner", "step one");
        session.publish(fixture.clone()).await;

        let relayed = receiver.recv().await.unwrap();
        assert_eq!(relayed, fixture);
        assert_eq!(session.history().await, vec![fixture]);
    }

    #[tokio::test]
    async fn test_publish_drops_blank_text() {
        let session = SessionContext::new(SessionId::generate());
        session
            .publish(ConversationMessage::text(ChatRole::Agent, "Critic", "   "))
            .await;
        assert!(session.history().await.is_empty());
    }

    #[tokio::test]
    async fn test_cursor_resumes_where_it_left_off() {
        let session = SessionContext::new(SessionId::generate());
        for content in ["a", "b", "c"] {
            session
                .publish(ConversationMessage::text(ChatRole::Agent, "Planner", content))
                .await;
        }

        let (first, cursor) = session.messages_from(0).await;
        assert_eq!(first.len(), 3);
        assert_eq!(cursor, 3);

        let (rest, cursor) = session.messages_from(cursor).await;
        assert!(rest.is_empty());
        assert_eq!(cursor, 3);

        session
            .publish(ConversationMessage::new(
                ChatRole::Agent,
                "Manager",
                "done",
                MessageKind::FinalRecommendations,
            ))
            .await;
        let (tail, _) = session.messages_from(cursor).await;
        assert_eq!(tail.len(), 1);
        assert_eq!(tail[0].kind, MessageKind::FinalRecommendations);
    }

    #[tokio::test]
    async fn test_registry_create_get_remove() {
        let registry = SessionRegistry::new();
        let session = registry.create().await;
        let id = session.id();

        let fetched = registry.get(&id).await.unwrap();
        assert_eq!(fetched.id(), id);
        assert_eq!(registry.len().await, 1);

        registry.remove(&id).await;
        assert!(registry.get(&id).await.is_err());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_next_event_reports_closed_channel() {
        let session = SessionContext::new(SessionId::generate());
        let mut receiver = session.subscribe();
        drop(session);
        let actual = next_event(&mut receiver).await;
        assert_eq!(actual, SessionEvent::Closed);
    }

    #[tokio::test]
    async fn test_cursor_drain_sends_mid_subscribe_messages_once() {
        let session = SessionContext::new(SessionId::generate());
        session
            .publish(ConversationMessage::text(ChatRole::Agent, "Planner", "before"))
            .await;

        // "during" lands between subscribing and draining the backlog, so it
        // sits in both the transcript and the channel.
        let mut receiver = session.subscribe();
        session
            .publish(ConversationMessage::text(ChatRole::Agent, "Planner", "during"))
            .await;

        let (messages, mut cursor) = session.messages_from(0).await;
        let mut seen = messages;

        match next_event(&mut receiver).await {
            SessionEvent::Message(_) => {
                let (messages, next) = session.messages_from(cursor).await;
                cursor = next;
                seen.extend(messages);
            }
            other => panic!("expected a buffered message, got {other:?}"),
        }

        let contents: Vec<&str> = seen.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["before", "during"]);
        assert_eq!(cursor, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_finished_sessions_are_evicted_after_retention() {
        let registry = SessionRegistry::new();
        let finished = registry.create().await;
        let running = registry.create().await;
        finished.set_status(ChatStatus::Ended).await;
        running.set_status(ChatStatus::Ongoing).await;

        tokio::time::advance(SESSION_RETENTION + Duration::from_secs(1)).await;
        let pruned = registry.prune_expired(SESSION_RETENTION).await;

        assert_eq!(pruned, 1);
        assert!(registry.get(&finished.id()).await.is_err());
        assert!(registry.get(&running.id()).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribed_sessions_survive_retention() {
        let registry = SessionRegistry::new();
        let session = registry.create().await;
        session.set_status(ChatStatus::Error).await;
        let receiver = session.subscribe();

        tokio::time::advance(SESSION_RETENTION + Duration::from_secs(1)).await;
        assert_eq!(registry.prune_expired(SESSION_RETENTION).await, 0);

        drop(receiver);
        assert_eq!(registry.prune_expired(SESSION_RETENTION).await, 1);
        assert!(registry.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restarted_session_is_not_expired() {
        let session = SessionContext::new(SessionId::generate());
        session.set_status(ChatStatus::Ended).await;
        session.set_status(ChatStatus::Ongoing).await;

        tokio::time::advance(SESSION_RETENTION + Duration::from_secs(1)).await;
        assert!(!session.expired(SESSION_RETENTION).await);
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let registry = SessionRegistry::new();
        let first = registry.create().await;
        let second = registry.create().await;

        first
            .publish(ConversationMessage::text(ChatRole::User, "admin", "only mine"))
            .await;
        first.set_status(ChatStatus::Ongoing).await;

        assert!(second.history().await.is_empty());
        assert_eq!(second.status().await, ChatStatus::Idle);
        assert_eq!(first.status().await, ChatStatus::Ongoing);
    }
}
