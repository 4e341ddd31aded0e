use std::sync::Arc;

use optimonkey_domain::{
    search_subscription_ids, ConfidenceScore, Context, ContextMessage, ReviewResponse,
    ValidationOutcome,
};
use optimonkey_provider::{repair, structured_completion, AzureOpenAi};
use tracing::{info, warn};

const REVIEWER_SYSTEM_MESSAGE: &str =
    "You are an Azure cost optimization expert. Review the prompt and provide feedback.";

/// Gate that decides whether a prompt is worth an agent round.
///
/// Total by construction: every path, including provider outages and
/// undecodable model output, produces a [`ValidationOutcome`].
pub struct PromptValidator {
    provider: Option<Arc<AzureOpenAi>>,
    reviewer_name: String,
}

impl PromptValidator {
    pub fn new(provider: Option<Arc<AzureOpenAi>>) -> Self {
        Self { provider, reviewer_name: "Security Reviewer".to_string() }
    }

    pub async fn validate(&self, prompt: &str) -> ValidationOutcome {
        let found_ids = search_subscription_ids(prompt);
        info!(reviewer = %self.reviewer_name, ids = found_ids.len(), "Validating prompt");

        let client = match &self.provider {
            Some(client) => client,
            None => {
                warn!("No completion client available, using heuristic validation");
                return heuristic_outcome(&found_ids);
            }
        };

        let context = self.review_context(prompt, &found_ids);

        // Structured attempt first (bounded retries inside), then a raw
        // completion with lenient parsing, then the lowest tier.
        match structured_completion::<ReviewResponse>(client, &context).await {
            Ok(review) => ValidationOutcome::from_review(review),
            Err(err) => {
                warn!(error = %err, "Structured validation failed, falling back to raw completion");
                self.raw_fallback(&context).await
            }
        }
    }

    async fn raw_fallback(&self, context: &Context) -> ValidationOutcome {
        let completion = match self.provider.as_ref() {
            Some(client) => client.chat(context).await,
            None => return ValidationOutcome::failure("No completion client available"),
        };
        match completion {
            Ok(message) => match message.content {
                Some(content) => match repair::from_str::<ReviewResponse>(&content) {
                    Ok(review) => ValidationOutcome::from_review(review),
                    Err(err) => ValidationOutcome::failure(format!(
                        "Failed to parse response properly: {err}"
                    )),
                },
                None => ValidationOutcome::failure("Completion carried no content"),
            },
            Err(err) => ValidationOutcome::failure(err.to_string()),
        }
    }

    fn review_context(&self, prompt: &str, found_ids: &[String]) -> Context {
        let user_message = format!(
            "{reviewer}, please review the following prompt:\n\n\"{prompt}\"\n\n\
             Do not include any additional text outside the JSON object. \
             Valid subscription IDs found: {found_ids:?}. If no IDs are found, the \
             confidence score should be lower.\n\n\
             Respond strictly in JSON format:\n\
             {{\n  \"confidence_score\": <integer between 1-4>,\n  \
             \"explanation\": \"<detailed explanation>\"\n}}",
            reviewer = self.reviewer_name,
        );
        Context::default()
            .add_message(ContextMessage::system(REVIEWER_SYSTEM_MESSAGE))
            .add_message(ContextMessage::user(user_message))
    }
}

/// Subscription-ID heuristic used when no LLM client is configured: IDs in
/// the prompt are the only relevance signal we have.
fn heuristic_outcome(found_ids: &[String]) -> ValidationOutcome {
    let review = match found_ids.len() {
        0 => ReviewResponse::new(
            ConfidenceScore::Low,
            "No subscription IDs found in prompt. Basic validation only (no AI client available).",
        ),
        1 => ReviewResponse::new(
            ConfidenceScore::Medium,
            format!(
                "Found 1 subscription ID: {}. Basic validation only (no AI client available).",
                found_ids[0]
            ),
        ),
        n => ReviewResponse::new(
            ConfidenceScore::High,
            format!(
                "Found {n} subscription IDs: {}. Basic validation only (no AI client available).",
                found_ids.join(", ")
            ),
        ),
    };
    ValidationOutcome::from_review(review)
}
