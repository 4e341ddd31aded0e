use std::path::Path;

use optimonkey_domain::{render_cell, RecommendationRow};
use thiserror::Error;
use tracing::{error, info};

/// Message returned instead of a file when there is nothing to export.
pub const NO_RESULTS_SENTINEL: &str = "No results to save.";

#[derive(Debug, Error, PartialEq)]
pub enum ExportError {
    #[error("{NO_RESULTS_SENTINEL}")]
    Empty,

    /// Rows disagree on their key sets; partial data is never written.
    #[error("Error: Inconsistent data structure in results.")]
    InconsistentRows { index: usize },

    #[error("Error saving results to CSV: {0}")]
    Write(String),
}

/// Serializes recommendation rows to CSV text. Header order is the first
/// row's key order.
pub fn to_csv_string(rows: &[RecommendationRow]) -> Result<String, ExportError> {
    let first = rows.first().ok_or(ExportError::Empty)?;
    let keys: Vec<&String> = first.keys().collect();

    for (index, row) in rows.iter().enumerate().skip(1) {
        let same_keys = row.len() == keys.len() && keys.iter().all(|k| row.contains_key(*k));
        if !same_keys {
            error!(index, "Inconsistent keys found in result row");
            return Err(ExportError::InconsistentRows { index });
        }
    }

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(keys.iter().map(|k| k.as_str()))
        .map_err(|e| ExportError::Write(e.to_string()))?;
    for row in rows {
        writer
            .write_record(keys.iter().map(|k| render_cell(&row[*k])))
            .map_err(|e| ExportError::Write(e.to_string()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Write(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ExportError::Write(e.to_string()))
}

/// Writes rows to `path` and returns the CSV text on success.
pub fn save_to_file(rows: &[RecommendationRow], path: &Path) -> Result<String, ExportError> {
    let csv = to_csv_string(rows)?;
    std::fs::write(path, &csv).map_err(|e| ExportError::Write(e.to_string()))?;
    info!(path = %path.display(), rows = rows.len(), "Results saved to CSV");
    Ok(csv)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn fixture_row(pairs: &[(&str, serde_json::Value)]) -> RecommendationRow {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_round_trip_preserves_keys_and_row_count() {
        let fixture = vec![
            fixture_row(&[
                ("resource_name", json!("vm-01")),
                ("cost_saving", json!("$500")),
                ("recommendation", json!("Deallocate idle VM")),
            ]),
            fixture_row(&[
                ("resource_name", json!("disk-02")),
                ("cost_saving", json!("$120")),
                ("recommendation", json!("Delete unattached disk")),
            ]),
        ];

        let csv = to_csv_string(&fixture).unwrap();
        let mut reader = csv::Reader::from_reader(csv.as_bytes());
        let headers: Vec<String> = reader
            .headers()
            .unwrap()
            .iter()
            .map(str::to_string)
            .collect();
        let rows: Vec<_> = reader.records().collect::<Result<_, _>>().unwrap();

        assert_eq!(headers, vec!["resource_name", "cost_saving", "recommendation"]);
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[1][0], "disk-02");
    }

    #[test]
    fn test_empty_input_returns_sentinel_not_a_file() {
        let actual = to_csv_string(&[]);
        assert_eq!(actual, Err(ExportError::Empty));
        assert_eq!(ExportError::Empty.to_string(), NO_RESULTS_SENTINEL);
    }

    #[test]
    fn test_inconsistent_rows_are_rejected() {
        let fixture = vec![
            fixture_row(&[("a", json!(1)), ("b", json!(2))]),
            fixture_row(&[("a", json!(1)), ("c", json!(3))]),
        ];
        let actual = to_csv_string(&fixture);
        assert_eq!(actual, Err(ExportError::InconsistentRows { index: 1 }));
    }

    #[test]
    fn test_key_comparison_ignores_order() {
        let fixture = vec![
            fixture_row(&[("a", json!(1)), ("b", json!(2))]),
            fixture_row(&[("b", json!(4)), ("a", json!(3))]),
        ];
        let csv = to_csv_string(&fixture).unwrap();
        assert!(csv.starts_with("a,b\n"));
    }

    #[test]
    fn test_non_string_cells_use_json_form() {
        let fixture = vec![fixture_row(&[
            ("resource", json!("vm-01")),
            ("cpu_avg", json!(3.25)),
        ])];
        let csv = to_csv_string(&fixture).unwrap();
        assert!(csv.contains("vm-01,3.25"));
    }

    #[test]
    fn test_save_to_file_writes_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("azure_recommendations.csv");
        let fixture = vec![fixture_row(&[("resource", json!("vm-01"))])];

        let csv = save_to_file(&fixture, &path).unwrap();

        let actual = std::fs::read_to_string(&path).unwrap();
        assert_eq!(actual, csv);
    }
}
