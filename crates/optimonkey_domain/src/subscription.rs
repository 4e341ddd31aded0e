use std::sync::OnceLock;

use regex::Regex;

/// UUID-shaped Azure subscription identifier, lowercase hex only.
const SUBSCRIPTION_ID_PATTERN: &str =
    "[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}";

fn pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(SUBSCRIPTION_ID_PATTERN).unwrap())
}

/// Returns every non-overlapping subscription ID in `prompt`, left to right.
pub fn search_subscription_ids(prompt: &str) -> Vec<String> {
    pattern()
        .find_iter(prompt)
        .map(|m| m.as_str().to_string())
        .collect()
}

pub fn contains_subscription_id(prompt: &str) -> bool {
    pattern().is_match(prompt)
}
