//! The fixed agent team. Roles mirror a FinOps review board: a planner lays
//! out the steps, a coder drives the Azure tooling, a critic scores the work,
//! and proxy agents open the chat and execute tool calls.

use optimonkey_domain::TERMINATION_MARKER;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentKind {
    /// Opens the conversation; never takes a turn afterwards.
    Proxy,
    /// LLM-backed speaker.
    Assistant,
    /// Executes tool calls requested by the coder.
    Executor,
}

#[derive(Debug, Clone)]
pub struct Agent {
    pub name: String,
    pub kind: AgentKind,
    pub system_message: String,
    /// Only the coder gets tool access; everyone else talks.
    pub has_tools: bool,
}

impl Agent {
    fn new(
        name: &str,
        kind: AgentKind,
        system_message: impl Into<String>,
        has_tools: bool,
    ) -> Self {
        Self {
            name: name.to_string(),
            kind,
            system_message: system_message.into(),
            has_tools,
        }
    }
}

const PLANNER_MESSAGE: &str = "\
Given a task, determine what information is needed to complete it, how to \
obtain that information with the provided Azure functions, and what steps are \
required. Only suggest information relevant to the task. After each step is \
completed by others, check the progress and make sure the next step is \
executed correctly. If a step fails, identify the issue and suggest a \
workaround.";

const CRITIC_MESSAGE: &str = "\
You are highly skilled in evaluating the quality of a given analysis by \
providing a score from 1 (bad) to 10 (good) with clear rationale. Evaluate \
whether the functions were used in the right order, whether the data was \
filtered and aggregated appropriately, and how well the output meets the \
stated goal. Do not suggest code; only critique and list concrete actions \
for the coder.";

fn coder_message() -> String {
    format!(
        "You are a highly experienced programmer specialized in Azure. Follow \
         the approved plan. Always use the functions you have access to and \
         start with run_kusto_query. If a result indicates an error, fix the \
         problem and try again. When you find an answer, verify it carefully \
         and include verifiable evidence in your response. Reply \"{TERMINATION_MARKER}\" \
         at the end when everything is done."
    )
}

/// The default team in speaking order: Planner, Code_Guru, Critic, admin,
/// Executor.
pub fn default_team() -> Vec<Agent> {
    vec![
        Agent::new("Planner", AgentKind::Assistant, PLANNER_MESSAGE, false),
        Agent::new("Code_Guru", AgentKind::Assistant, coder_message(), true),
        Agent::new("Critic", AgentKind::Assistant, CRITIC_MESSAGE, false),
        Agent::new(
            "admin",
            AgentKind::Proxy,
            "Give the task and send instructions to the critic to evaluate and refine the work.",
            false,
        ),
        Agent::new(
            "Executor",
            AgentKind::Executor,
            "Execute the functions requested by the coder and report the results.",
            false,
        ),
    ]
}

/// Default analysis task, parameterized on the configured subscription and
/// lookback window.
pub fn default_prompt(subscription_id: Option<&str>, days: u32) -> String {
    let scope = match subscription_id {
        Some(id) => format!("on subscription {id}"),
        None => "across the accessible subscriptions".to_string(),
    };
    format!(
        "You are a professional Azure consultant. Analyze my Azure environment \
         {scope} and find the top 5 opportunities to save money based on \
         activity and usage over the last {days} days. Start with \
         run_kusto_query, then query usage metrics to prove the resources are \
         idle or underused, and save the results to a CSV file. Provide advice \
         on what to do with this information along with the results. Give me \
         only 5 recommendations to work with."
    )
}
