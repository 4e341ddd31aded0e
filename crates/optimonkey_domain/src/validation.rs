use serde::{Deserialize, Serialize};

use crate::ConfidenceScore;

/// Structured shape the reviewer model is asked to produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewResponse {
    pub confidence_score: ConfidenceScore,
    #[serde(default)]
    pub explanation: String,
}

impl ReviewResponse {
    pub fn new(confidence_score: ConfidenceScore, explanation: impl Into<String>) -> Self {
        Self { confidence_score, explanation: explanation.into() }
    }
}

/// Final verdict of the prompt validation gate. Immutable once produced;
/// callers use [`ValidationOutcome::passed`] to decide whether to run the
/// agent round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub confidence_score: ConfidenceScore,
    pub explanation: String,
    pub board_decision: String,
    pub score_name: String,
}

impl ValidationOutcome {
    pub fn from_review(review: ReviewResponse) -> Self {
        let score = review.confidence_score;
        let decision = if score >= ConfidenceScore::Medium {
            "PASS"
        } else {
            "FAIL"
        };
        Self {
            confidence_score: score,
            explanation: review.explanation,
            board_decision: format!(
                "FinOps Governing Board {decision} - Confidence Score: {score}"
            ),
            score_name: score.to_string(),
        }
    }

    /// Outcome for a validation attempt that failed outright. Always the
    /// lowest tier; the gate never surfaces an error to its caller.
    pub fn failure(explanation: impl Into<String>) -> Self {
        Self {
            confidence_score: ConfidenceScore::Low,
            explanation: explanation.into(),
            board_decision: "FinOps Governing Board FAIL - Validation Error".to_string(),
            score_name: ConfidenceScore::Low.to_string(),
        }
    }

    pub fn passed(&self) -> bool {
        self.confidence_score >= ConfidenceScore::Medium
    }

    /// Human-readable block the relay forwards to the client.
    pub fn summary(&self) -> String {
        let icon = if self.confidence_score >= ConfidenceScore::High {
            "✅"
        } else if self.confidence_score == ConfidenceScore::Medium {
            "⚠️"
        } else {
            "❌"
        };
        format!(
            "{icon} Confidence Score: {}/4 ({})\nBoard Decision: {}\nExplanation: {}",
            self.confidence_score.value(),
            self.score_name,
            self.board_decision,
            self.explanation
        )
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_outcome_passes_at_medium_and_above() {
        for (score, expected) in [
            (ConfidenceScore::Low, false),
            (ConfidenceScore::Medium, true),
            (ConfidenceScore::High, true),
            (ConfidenceScore::Excellent, true),
        ] {
            let outcome =
                ValidationOutcome::from_review(ReviewResponse::new(score, "reasoning"));
            assert_eq!(outcome.passed(), expected, "score {score}");
        }
    }

    #[test]
    fn test_board_decision_text() {
        let fixture = ReviewResponse::new(ConfidenceScore::High, "on topic");
        let actual = ValidationOutcome::from_review(fixture);
        let expected = "FinOps Governing Board PASS - Confidence Score: HIGH";
        assert_eq!(actual.board_decision, expected);
        assert_eq!(actual.score_name, "HIGH");
    }

    #[test]
    fn test_failure_outcome_is_low_and_fails() {
        let actual = ValidationOutcome::failure("provider unreachable");
        assert_eq!(actual.confidence_score, ConfidenceScore::Low);
        assert_eq!(actual.score_name, "LOW");
        assert!(!actual.passed());
        assert_eq!(actual.explanation, "provider unreachable");
    }

    #[test]
    fn test_summary_contains_score_and_decision() {
        let outcome =
            ValidationOutcome::from_review(ReviewResponse::new(ConfidenceScore::Medium, "ok"));
        let actual = outcome.summary();
        assert!(actual.contains("Confidence Score: 2/4 (MEDIUM)"));
        assert!(actual.contains("Board Decision: FinOps Governing Board PASS"));
    }

    #[test]
    fn test_outcome_serializes_score_as_integer() {
        let outcome =
            ValidationOutcome::from_review(ReviewResponse::new(ConfidenceScore::High, "x"));
        let actual = serde_json::to_value(&outcome).unwrap();
        assert_eq!(actual["confidence_score"], serde_json::json!(3));
        assert_eq!(actual["score_name"], serde_json::json!("HIGH"));
    }
}
