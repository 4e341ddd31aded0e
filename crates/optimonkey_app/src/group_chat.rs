use std::sync::Arc;

use optimonkey_domain::{
    ChatRole, ChatStatus, Context, ContextMessage, ConversationMessage, MessageKind,
    ToolCallFull,
};
use optimonkey_provider::AzureOpenAi;
use tracing::{debug, error, info};

use crate::agents::{Agent, AgentKind};
use crate::session::SessionContext;
use crate::tools::ToolRegistry;

/// Upper bound on speaker turns for one conversation.
pub const MAX_ROUNDS: usize = 50;

/// Round-robin chat over the agent team. Each run owns its transcript; the
/// session only sees the published messages.
pub struct GroupChat {
    provider: Option<Arc<AzureOpenAi>>,
    tools: Arc<ToolRegistry>,
    team: Vec<Agent>,
    max_rounds: usize,
}

impl GroupChat {
    pub fn new(
        provider: Option<Arc<AzureOpenAi>>,
        tools: Arc<ToolRegistry>,
        team: Vec<Agent>,
        max_rounds: usize,
    ) -> Self {
        Self { provider, tools, team, max_rounds }
    }

    /// Runs the team against `prompt`, publishing every turn to the session.
    /// Never returns an error; failures become error messages on the stream
    /// and an `Error` status.
    pub async fn run(&self, session: &SessionContext, prompt: &str) {
        session
            .publish(ConversationMessage::text(ChatRole::User, "admin", prompt))
            .await;

        let provider = match &self.provider {
            Some(provider) => provider.clone(),
            None => {
                session
                    .publish(ConversationMessage::error(
                        "Azure OpenAI client not configured; the agent team cannot run.",
                    ))
                    .await;
                session.set_status(ChatStatus::Error).await;
                return;
            }
        };

        let mut transcript = vec![ContextMessage::user(prompt)];
        let mut pending_calls: Vec<ToolCallFull> = Vec::new();
        let mut terminated = false;
        let executor_name = self
            .team
            .iter()
            .find(|a| a.kind == AgentKind::Executor)
            .map(|a| a.name.clone())
            .unwrap_or_else(|| "Executor".to_string());

        'rounds: for round in 0..self.max_rounds {
            let agent = &self.team[round % self.team.len()];
            match agent.kind {
                // The proxy already opened the chat with the prompt.
                AgentKind::Proxy => continue,
                AgentKind::Executor => {
                    if pending_calls.is_empty() {
                        continue;
                    }
                    let calls = std::mem::take(&mut pending_calls);
                    self.execute_calls(session, &mut transcript, &agent.name, calls)
                        .await;
                }
                AgentKind::Assistant => {
                    let context = self.agent_context(agent, &transcript);
                    let completion = match provider.chat(&context).await {
                        Ok(completion) => completion,
                        Err(err) => {
                            error!(agent = %agent.name, error = %err, "Agent turn failed");
                            session
                                .publish(ConversationMessage::error(format!(
                                    "Agent {} failed: {err}",
                                    agent.name
                                )))
                                .await;
                            session.set_status(ChatStatus::Error).await;
                            return;
                        }
                    };

                    let content = completion.content_or_default();
                    if !content.trim().is_empty() {
                        transcript.push(ContextMessage::assistant(&agent.name, &content));
                        session
                            .publish(ConversationMessage::text(
                                ChatRole::Agent,
                                &agent.name,
                                &content,
                            ))
                            .await;
                    }
                    if completion.has_tool_calls() {
                        debug!(
                            agent = %agent.name,
                            calls = completion.tool_calls.len(),
                            "Agent requested tool calls"
                        );
                        pending_calls.extend(completion.tool_calls);
                    }
                    if content.contains(optimonkey_domain::TERMINATION_MARKER) {
                        // A sign-off can still carry tool calls (saving the
                        // CSV and terminating in one message); run them
                        // before stopping.
                        if !pending_calls.is_empty() {
                            let calls = std::mem::take(&mut pending_calls);
                            self.execute_calls(session, &mut transcript, &executor_name, calls)
                                .await;
                        }
                        info!(agent = %agent.name, round, "Conversation terminated by agent");
                        terminated = true;
                        break 'rounds;
                    }
                }
            }
        }

        if !terminated {
            info!(max_rounds = self.max_rounds, "Conversation hit the round limit");
        }

        let summary = collect_recommendations(&session.history().await);
        session
            .publish(ConversationMessage::new(
                ChatRole::Agent,
                "Manager",
                summary,
                MessageKind::FinalRecommendations,
            ))
            .await;
        session.set_status(ChatStatus::Ended).await;
    }

    fn agent_context(&self, agent: &Agent, transcript: &[ContextMessage]) -> Context {
        let mut context = Context::default()
            .add_message(ContextMessage::system(&agent.system_message))
            .extend_messages(transcript.iter().cloned());
        if agent.has_tools {
            context.tools = self.tools.definitions();
        }
        context
    }

    async fn execute_calls(
        &self,
        session: &SessionContext,
        transcript: &mut Vec<ContextMessage>,
        executor_name: &str,
        calls: Vec<ToolCallFull>,
    ) {
        for call in calls {
            info!(tool = %call.name, "Executing tool call");
            let outcome = self.tools.call(&call).await;
            let kind = if outcome.saved.is_some() {
                MessageKind::Csv
            } else if outcome.result.is_error {
                MessageKind::Error
            } else {
                MessageKind::Text
            };
            transcript.push(ContextMessage::user(format!(
                "Tool {} returned: {}",
                outcome.result.name, outcome.result.content
            )));
            session
                .publish(ConversationMessage::new(
                    ChatRole::Agent,
                    executor_name,
                    &outcome.result.content,
                    kind,
                ))
                .await;
            if let Some(saved) = outcome.saved {
                session.set_recommendations(saved).await;
            }
        }
    }
}

/// Builds the closing summary from every agent message that talks about
/// recommendations. Tool sentinels and the termination marker are noise, not
/// advice, so they are filtered out.
pub fn collect_recommendations(history: &[ConversationMessage]) -> String {
    let picks: Vec<&str> = history
        .iter()
        .filter(|m| m.role == ChatRole::Agent && m.kind != MessageKind::Error)
        .filter(|m| m.content.to_lowercase().contains("recommend"))
        .map(|m| m.content.as_str())
        .collect();
    if picks.is_empty() {
        "No recommendations were produced in this conversation.".to_string()
    } else {
        format!("Final Recommendations:\n\n{}", picks.join("\n\n"))
    }
}
