use std::sync::Arc;

use optimonkey_domain::{ChatRole, ChatStatus, ConversationMessage, MessageKind};
use optimonkey_provider::AzureOpenAi;
use tokio::task::JoinHandle;
use tracing::info;

use crate::agents::{default_prompt, default_team};
use crate::group_chat::{GroupChat, MAX_ROUNDS};
use crate::session::SessionContext;
use crate::tools::ToolRegistry;
use crate::validator::PromptValidator;

const BOARD_NAME: &str = "FinOps Governing Board";

/// Drives one conversation end to end: validation gate first, then the agent
/// team. Shared across sessions; all per-conversation state lives in the
/// [`SessionContext`].
pub struct ConversationEngine {
    validator: PromptValidator,
    chat: GroupChat,
    default_subscription: Option<String>,
    analysis_days: u32,
}

impl ConversationEngine {
    pub fn new(
        provider: Option<Arc<AzureOpenAi>>,
        tools: Arc<ToolRegistry>,
        default_subscription: Option<String>,
        analysis_days: u32,
    ) -> Self {
        Self {
            validator: PromptValidator::new(provider.clone()),
            chat: GroupChat::new(provider, tools, default_team(), MAX_ROUNDS),
            default_subscription,
            analysis_days,
        }
    }

    /// The canned analysis task used when the client starts agents without a
    /// prompt of its own.
    pub fn default_prompt(&self) -> String {
        default_prompt(self.default_subscription.as_deref(), self.analysis_days)
    }

    /// Starts a conversation on a background task. The caller must have
    /// checked that the session is not already ongoing.
    pub fn spawn_conversation(
        self: &Arc<Self>,
        session: Arc<SessionContext>,
        prompt: Option<String>,
    ) -> JoinHandle<()> {
        let engine = self.clone();
        let prompt = prompt.unwrap_or_else(|| engine.default_prompt());
        tokio::spawn(async move {
            engine.run_conversation(&session, &prompt).await;
        })
    }

    async fn run_conversation(&self, session: &SessionContext, prompt: &str) {
        session.set_status(ChatStatus::Ongoing).await;
        info!(session_id = %session.id(), "Conversation started");

        let outcome = self.validator.validate(prompt).await;
        let payload = serde_json::to_string(&outcome).unwrap_or_default();
        session
            .publish(ConversationMessage::new(
                ChatRole::System,
                BOARD_NAME,
                payload,
                MessageKind::ConfidenceScore,
            ))
            .await;
        session
            .publish(ConversationMessage::text(
                ChatRole::System,
                BOARD_NAME,
                outcome.summary(),
            ))
            .await;

        if !outcome.passed() {
            // Relays stop on final-recommendations messages; a rejected
            // prompt closes the stream the same way a finished run does.
            session
                .publish(ConversationMessage::new(
                    ChatRole::System,
                    BOARD_NAME,
                    format!(
                        "Prompt validation failed. {}\nPlease refine the prompt and try again.",
                        outcome.board_decision
                    ),
                    MessageKind::FinalRecommendations,
                ))
                .await;
            session.set_status(ChatStatus::Ended).await;
            return;
        }

        self.chat.run(session, prompt).await;
    }
}
