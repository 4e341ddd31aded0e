use serde::de::DeserializeOwned;
use tracing::warn;

use crate::repair;
use crate::{AzureOpenAi, Error, Result};
use optimonkey_domain::Context;

/// Upper bound on completion attempts when coercing structured output.
pub const MAX_STRUCTURED_ATTEMPTS: usize = 3;

/// Requests a JSON-constrained completion and decodes it into `T`, retrying a
/// bounded number of times. Returns the last failure once attempts run out;
/// it never retries beyond [`MAX_STRUCTURED_ATTEMPTS`].
pub async fn structured_completion<T>(client: &AzureOpenAi, context: &Context) -> Result<T>
where
    T: DeserializeOwned,
{
    let mut last_error = String::new();
    for attempt in 1..=MAX_STRUCTURED_ATTEMPTS {
        match client.chat_json(context).await {
            Ok(content) => match repair::from_str::<T>(&content) {
                Ok(value) => return Ok(value),
                Err(err) => {
                    warn!(attempt, error = %err, "Structured decoding failed");
                    last_error = err.to_string();
                }
            },
            Err(err) => {
                warn!(attempt, error = %err, "Completion request failed");
                last_error = err.to_string();
            }
        }
    }
    Err(Error::StructuredDecoding { attempts: MAX_STRUCTURED_ATTEMPTS, last_error })
}
