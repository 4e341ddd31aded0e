use indexmap::IndexMap;
use serde_json::Value;

/// One recommendation produced by the agent round. Key order is insertion
/// order, which in turn defines the CSV header order.
pub type RecommendationRow = IndexMap<String, Value>;

/// Renders one cell for CSV output: strings unquoted, everything else in its
/// JSON form.
pub fn render_cell(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_row_preserves_insertion_order() {
        let mut fixture = RecommendationRow::new();
        fixture.insert("resource_name".into(), json!("vm-01"));
        fixture.insert("cost_saving".into(), json!("$500"));
        fixture.insert("recommendation".into(), json!("Deallocate"));
        let actual: Vec<&String> = fixture.keys().collect();
        let expected = vec!["resource_name", "cost_saving", "recommendation"];
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_render_cell() {
        assert_eq!(render_cell(&json!("plain")), "plain");
        assert_eq!(render_cell(&json!(12.5)), "12.5");
        assert_eq!(render_cell(&json!(null)), "");
        assert_eq!(render_cell(&json!({"k": 1})), "{\"k\":1}");
    }
}
