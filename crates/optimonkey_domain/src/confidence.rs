use std::str::FromStr;

use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum_macros::{Display, EnumString};

/// Ordinal rating of how relevant a prompt is to Azure cost optimization.
///
/// The wire representation is the integer value (1..=4); the name form
/// (`LOW`..`EXCELLENT`) is what reviewers and the UI display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum ConfidenceScore {
    Low = 1,
    Medium = 2,
    High = 3,
    Excellent = 4,
}

impl ConfidenceScore {
    pub fn value(self) -> u8 {
        self as u8
    }

    pub fn from_value(value: i64) -> Option<Self> {
        match value {
            1 => Some(Self::Low),
            2 => Some(Self::Medium),
            3 => Some(Self::High),
            4 => Some(Self::Excellent),
            _ => None,
        }
    }

    /// Coerces arbitrary model output into a score.
    ///
    /// Accepts the integer form (`3`), a stringified integer (`"3"`), a level
    /// name in any case (`"high"`), and the `VERY_HIGH` alias some models
    /// substitute for `EXCELLENT`. Anything unrecognized collapses to `Low`.
    pub fn coerce(value: &Value) -> Self {
        match value {
            Value::Number(n) => n.as_i64().and_then(Self::from_value),
            Value::String(s) => Self::coerce_str(s),
            _ => None,
        }
        .unwrap_or(Self::Low)
    }

    fn coerce_str(value: &str) -> Option<Self> {
        let value = value.trim();
        if let Ok(n) = value.parse::<i64>() {
            return Self::from_value(n);
        }
        if value.eq_ignore_ascii_case("VERY_HIGH") {
            return Some(Self::Excellent);
        }
        Self::from_str(value).ok()
    }
}

impl Serialize for ConfidenceScore {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.value())
    }
}

impl<'de> Deserialize<'de> for ConfidenceScore {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::coerce(&value))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_coerce_integer_values() {
        let actual: Vec<ConfidenceScore> = (1..=4)
            .map(|n| ConfidenceScore::coerce(&json!(n)))
            .collect();
        let expected = vec![
            ConfidenceScore::Low,
            ConfidenceScore::Medium,
            ConfidenceScore::High,
            ConfidenceScore::Excellent,
        ];
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_coerce_string_name() {
        let actual = ConfidenceScore::coerce(&json!("high"));
        assert_eq!(actual, ConfidenceScore::High);
    }

    #[test]
    fn test_coerce_stringified_integer() {
        let actual = ConfidenceScore::coerce(&json!("4"));
        assert_eq!(actual, ConfidenceScore::Excellent);
    }

    #[test]
    fn test_coerce_very_high_alias() {
        let actual = ConfidenceScore::coerce(&json!("VERY_HIGH"));
        assert_eq!(actual, ConfidenceScore::Excellent);
    }

    #[test]
    fn test_coerce_out_of_range_defaults_to_low() {
        let fixture = [json!(0), json!(5), json!("nonsense"), json!(null), json!([])];
        for value in &fixture {
            assert_eq!(ConfidenceScore::coerce(value), ConfidenceScore::Low);
        }
    }

    #[test]
    fn test_serialize_as_integer() {
        let actual = serde_json::to_string(&ConfidenceScore::High).unwrap();
        assert_eq!(actual, "3");
    }

    #[test]
    fn test_deserialize_is_total() {
        let actual: ConfidenceScore = serde_json::from_str("\"MEDIUM\"").unwrap();
        assert_eq!(actual, ConfidenceScore::Medium);
        let actual: ConfidenceScore = serde_json::from_str("{}").unwrap();
        assert_eq!(actual, ConfidenceScore::Low);
    }

    #[test]
    fn test_display_uppercase_name() {
        let actual = ConfidenceScore::Excellent.to_string();
        assert_eq!(actual, "EXCELLENT");
    }

    #[test]
    fn test_ordering_tracks_value() {
        assert!(ConfidenceScore::Low < ConfidenceScore::Medium);
        assert!(ConfidenceScore::Medium >= ConfidenceScore::Medium);
        assert!(ConfidenceScore::Excellent > ConfidenceScore::High);
    }
}
