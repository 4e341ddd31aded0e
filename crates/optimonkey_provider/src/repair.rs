//! Lenient JSON decoding for model output.
//!
//! Models asked for "strict JSON" still wrap payloads in code fences, prefix
//! them with prose, leave trailing commas, or truncate mid-object. This module
//! recovers the usual cases before giving up.

use serde::de::DeserializeOwned;

/// Drop-in replacement for `serde_json::from_str` that attempts recovery when
/// normal parsing fails. The original parse error is preserved if recovery
/// also fails.
pub fn from_str<T>(input: &str) -> serde_json::Result<T>
where
    T: DeserializeOwned,
{
    match serde_json::from_str::<T>(input) {
        Ok(value) => Ok(value),
        Err(err) => {
            tracing::warn!("JSON parsing failed, attempting lenient repair");
            let candidate = repair_candidate(extract_candidate(input));
            match serde_json::from_str::<T>(&candidate) {
                Ok(value) => {
                    tracing::info!("JSON repair successful");
                    Ok(value)
                }
                Err(repair_err) => {
                    tracing::error!(error = %repair_err, "JSON repair failed");
                    Err(err)
                }
            }
        }
    }
}

/// Strips code fences and surrounding prose, keeping the outermost JSON
/// object or array.
fn extract_candidate(input: &str) -> &str {
    let input = strip_fences(input.trim());
    match input.find(['{', '[']) {
        Some(start) => {
            let close = if input.as_bytes()[start] == b'{' { '}' } else { ']' };
            match input.rfind(close) {
                Some(end) if end > start => &input[start..=end],
                _ => &input[start..],
            }
        }
        None => input,
    }
}

fn strip_fences(input: &str) -> &str {
    let Some(rest) = input.strip_prefix("```") else {
        return input;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.trim_start();
    rest.strip_suffix("```").map(str::trim_end).unwrap_or(rest)
}

/// Single pass that removes trailing commas and closes unterminated strings,
/// objects and arrays. String contents are passed through untouched.
fn repair_candidate(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 4);
    let mut closers: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for c in input.chars() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '{' => {
                closers.push('}');
                out.push(c);
            }
            '[' => {
                closers.push(']');
                out.push(c);
            }
            '}' | ']' => {
                trim_trailing_comma(&mut out);
                closers.pop();
                out.push(c);
            }
            _ => out.push(c),
        }
    }

    if in_string {
        out.push('"');
    }
    trim_trailing_comma(&mut out);
    while let Some(closer) = closers.pop() {
        out.push(closer);
    }
    out
}

fn trim_trailing_comma(out: &mut String) {
    let trimmed = out.trim_end();
    if trimmed.ends_with(',') {
        out.truncate(trimmed.len() - 1);
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Review {
        confidence_score: i64,
        explanation: String,
    }

    #[test]
    fn test_valid_json_passes_through() {
        let fixture = r#"{"confidence_score": 3, "explanation": "on topic"}"#;
        let actual: Review = from_str(fixture).unwrap();
        let expected = Review { confidence_score: 3, explanation: "on topic".to_string() };
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_code_fenced_payload() {
        let fixture = "```json\n{\"confidence_score\": 2, \"explanation\": \"maybe\"}\n```";
        let actual: Review = from_str(fixture).unwrap();
        assert_eq!(actual.confidence_score, 2);
    }

    #[test]
    fn test_payload_wrapped_in_prose() {
        let fixture = "Sure! Here is the review:\n\
                       {\"confidence_score\": 4, \"explanation\": \"great\"} hope that helps";
        let actual: Review = from_str(fixture).unwrap();
        assert_eq!(actual.confidence_score, 4);
    }

    #[test]
    fn test_trailing_comma() {
        let fixture = r#"{"confidence_score": 1, "explanation": "off topic",}"#;
        let actual: Review = from_str(fixture).unwrap();
        assert_eq!(actual.explanation, "off topic");
    }

    #[test]
    fn test_truncated_object_is_closed() {
        let fixture = r#"{"confidence_score": 2, "explanation": "cut off"#;
        let actual: Review = from_str(fixture).unwrap();
        assert_eq!(actual.explanation, "cut off");
    }

    #[test]
    fn test_truncated_array() {
        let fixture = "[1, 2, 3";
        let actual: Vec<i64> = from_str(fixture).unwrap();
        assert_eq!(actual, vec![1, 2, 3]);
    }

    #[test]
    fn test_braces_inside_strings_are_ignored() {
        let fixture = r#"{"explanation": "use {braces} and [brackets]", "confidence_score": 3}"#;
        let actual: Review = from_str(fixture).unwrap();
        assert_eq!(actual.explanation, "use {braces} and [brackets]");
    }

    #[test]
    fn test_unrecoverable_input_reports_original_error() {
        let actual = from_str::<Review>("not json at all");
        assert!(actual.is_err());
    }
}
