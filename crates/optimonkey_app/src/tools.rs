use std::path::PathBuf;

use optimonkey_azure::{MonitorClient, ResourceGraphClient};
use optimonkey_domain::{RecommendationRow, ToolCallFull, ToolDefinition, ToolResult};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, warn};

use crate::export;

pub const RUN_KUSTO_QUERY: &str = "run_kusto_query";
pub const QUERY_USAGE_METRICS: &str = "query_usage_metrics";
pub const SAVE_RESULTS_TO_CSV: &str = "save_results_to_csv";

const DEFAULT_CSV_FILENAME: &str = "azure_recommendations.csv";

/// CSV produced by a `save_results_to_csv` call, kept for the download
/// endpoint alongside the on-disk copy.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedCsv {
    pub csv: String,
    pub rows: Vec<RecommendationRow>,
    pub path: PathBuf,
}

/// Result of dispatching one tool call.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutcome {
    pub result: ToolResult,
    pub saved: Option<SavedCsv>,
}

impl ToolOutcome {
    fn plain(result: ToolResult) -> Self {
        Self { result, saved: None }
    }
}

#[derive(Debug, Deserialize)]
struct KustoArgs {
    query: String,
    #[serde(default)]
    subscriptions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct MetricsArgs {
    resource_id: String,
    resource_type: String,
    #[serde(default)]
    metric_names: Option<Vec<String>>,
    #[serde(default = "default_aggregation")]
    aggregation: String,
    #[serde(default = "default_timespan")]
    timespan: String,
    #[serde(default)]
    interval: Option<String>,
}

fn default_aggregation() -> String {
    "Average".to_string()
}

fn default_timespan() -> String {
    "P30D".to_string()
}

#[derive(Debug, Deserialize)]
struct SaveCsvArgs {
    #[serde(default)]
    results: Vec<RecommendationRow>,
    #[serde(default)]
    filename: Option<String>,
}

/// The three functions registered with the coder agent, dispatched on behalf
/// of the Executor.
pub struct ToolRegistry {
    resource_graph: Option<ResourceGraphClient>,
    monitor: Option<MonitorClient>,
    default_subscription: Option<String>,
    output_dir: PathBuf,
}

impl ToolRegistry {
    pub fn new(
        resource_graph: Option<ResourceGraphClient>,
        monitor: Option<MonitorClient>,
        default_subscription: Option<String>,
        output_dir: PathBuf,
    ) -> Self {
        Self { resource_graph, monitor, default_subscription, output_dir }
    }

    /// Declarations advertised to the model.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        vec![
            ToolDefinition::new(
                RUN_KUSTO_QUERY,
                "Run a Kusto Query Language (KQL) query using Azure Resource Graph to get \
                 resource details from the specified subscriptions.",
                json!({
                    "type": "object",
                    "properties": {
                        "query": {"type": "string", "description": "The KQL query"},
                        "subscriptions": {
                            "type": "array",
                            "items": {"type": "string"},
                            "description": "List of subscription IDs"
                        }
                    },
                    "required": ["query"]
                }),
            ),
            ToolDefinition::new(
                QUERY_USAGE_METRICS,
                "Query Azure Monitor usage metrics for the specified resource, with \
                 per-resource-type metric defaults.",
                json!({
                    "type": "object",
                    "properties": {
                        "resource_id": {"type": "string"},
                        "resource_type": {"type": "string"},
                        "metric_names": {"type": "array", "items": {"type": "string"}},
                        "aggregation": {"type": "string"},
                        "timespan": {"type": "string"},
                        "interval": {"type": "string"}
                    },
                    "required": ["resource_id", "resource_type"]
                }),
            ),
            ToolDefinition::new(
                SAVE_RESULTS_TO_CSV,
                "Save the analysis results to a CSV file. Each result is one row; all rows \
                 must share the same keys.",
                json!({
                    "type": "object",
                    "properties": {
                        "results": {"type": "array", "items": {"type": "object"}},
                        "filename": {"type": "string"}
                    },
                    "required": ["results"]
                }),
            ),
        ]
    }

    pub async fn call(&self, call: &ToolCallFull) -> ToolOutcome {
        match call.name.as_str() {
            RUN_KUSTO_QUERY => self.run_kusto_query(call).await,
            QUERY_USAGE_METRICS => self.query_usage_metrics(call).await,
            SAVE_RESULTS_TO_CSV => self.save_results_to_csv(call),
            other => ToolOutcome::plain(ToolResult::failure(
                other,
                format!("Unknown tool: {other}"),
            )),
        }
    }

    async fn run_kusto_query(&self, call: &ToolCallFull) -> ToolOutcome {
        let args: KustoArgs = match serde_json::from_value(call.arguments.clone()) {
            Ok(args) => args,
            Err(err) => return ToolOutcome::plain(bad_arguments(RUN_KUSTO_QUERY, &err)),
        };
        let mut subscriptions = args.subscriptions;
        if subscriptions.is_empty() {
            subscriptions.extend(self.default_subscription.clone());
        }

        let rows = match &self.resource_graph {
            Some(client) => match client.resources(&args.query, &subscriptions).await {
                Ok(rows) => rows,
                Err(err) => {
                    // Cloud failures degrade to an empty result set.
                    error!(error = %err, "Resource Graph query failed");
                    Vec::new()
                }
            },
            None => {
                warn!("Resource Graph client not configured; returning no resources");
                Vec::new()
            }
        };

        let content = if rows.is_empty() {
            "No resources found.".to_string()
        } else {
            serde_json::to_string(&rows).unwrap_or_else(|_| "No resources found.".to_string())
        };
        ToolOutcome::plain(ToolResult::success(RUN_KUSTO_QUERY, content))
    }

    async fn query_usage_metrics(&self, call: &ToolCallFull) -> ToolOutcome {
        let args: MetricsArgs = match serde_json::from_value(call.arguments.clone()) {
            Ok(args) => args,
            Err(err) => return ToolOutcome::plain(bad_arguments(QUERY_USAGE_METRICS, &err)),
        };

        let client = match &self.monitor {
            Some(client) => client,
            None => {
                warn!("Monitor client not configured; returning no metrics");
                return ToolOutcome::plain(ToolResult::success(
                    QUERY_USAGE_METRICS,
                    "No metrics available.",
                ));
            }
        };

        match client
            .query_usage_metrics(
                &args.resource_id,
                &args.resource_type,
                args.metric_names,
                &args.aggregation,
                &args.timespan,
                args.interval,
            )
            .await
        {
            Ok(usage) => {
                let mut payload = serde_json::Map::new();
                payload.insert("resource_id".to_string(), json!(usage.resource_id));
                for (name, value) in usage.metrics {
                    payload.insert(name, json!(value));
                }
                ToolOutcome::plain(ToolResult::success(
                    QUERY_USAGE_METRICS,
                    serde_json::Value::Object(payload).to_string(),
                ))
            }
            Err(optimonkey_azure::Error::UnsupportedResourceType(t)) => ToolOutcome::plain(
                ToolResult::failure(
                    QUERY_USAGE_METRICS,
                    format!("Unsupported resource type: {t}"),
                ),
            ),
            Err(err) => {
                error!(error = %err, "Monitor query failed");
                ToolOutcome::plain(ToolResult::success(
                    QUERY_USAGE_METRICS,
                    "No metrics available.",
                ))
            }
        }
    }

    fn save_results_to_csv(&self, call: &ToolCallFull) -> ToolOutcome {
        let args: SaveCsvArgs = match serde_json::from_value(call.arguments.clone()) {
            Ok(args) => args,
            Err(err) => return ToolOutcome::plain(bad_arguments(SAVE_RESULTS_TO_CSV, &err)),
        };

        let filename = args
            .filename
            .unwrap_or_else(|| DEFAULT_CSV_FILENAME.to_string());
        let path = self.output_dir.join(filename);

        match export::save_to_file(&args.results, &path) {
            Ok(csv) => ToolOutcome {
                result: ToolResult::success(
                    SAVE_RESULTS_TO_CSV,
                    format!("Results successfully saved to {}", path.display()),
                ),
                saved: Some(SavedCsv { csv, rows: args.results, path }),
            },
            Err(export::ExportError::Empty) => ToolOutcome::plain(ToolResult::success(
                SAVE_RESULTS_TO_CSV,
                export::NO_RESULTS_SENTINEL,
            )),
            Err(err) => {
                ToolOutcome::plain(ToolResult::failure(SAVE_RESULTS_TO_CSV, err.to_string()))
            }
        }
    }
}

fn bad_arguments(tool: &str, err: &serde_json::Error) -> ToolResult {
    warn!(tool, error = %err, "Malformed tool arguments");
    ToolResult::failure(tool, format!("Malformed arguments: {err}"))
}
