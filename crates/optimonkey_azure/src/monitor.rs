use std::sync::Arc;

use indexmap::IndexMap;
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::debug;

use crate::{Error, Result, TokenCredential};

const DEFAULT_ENDPOINT: &str = "https://management.azure.com/";
const API_VERSION: &str = "2018-01-01";

/// Averaged usage of one resource over the queried timespan, one entry per
/// metric, in query order.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceUsage {
    pub resource_id: String,
    pub metrics: IndexMap<String, f64>,
}

/// Default metric set and time grain for a resource type. Types outside this
/// table are rejected rather than queried blind.
pub fn metric_defaults(resource_type: &str) -> Result<(&'static [&'static str], &'static str)> {
    match resource_type.to_ascii_lowercase().as_str() {
        "microsoft.compute/virtualmachines" => Ok((
            &[
                "Percentage CPU",
                "Network In",
                "Network Out",
                "Disk Read Bytes",
                "Disk Write Bytes",
            ],
            "P1D",
        )),
        "microsoft.storage/storageaccounts" => Ok((
            &[
                "UsedCapacity",
                "Transactions",
                "Ingress",
                "Egress",
                "Availability",
            ],
            "PT1H",
        )),
        "microsoft.compute/disks" => Ok((
            &[
                "Composite Disk Read Bytes/sec",
                "Composite Disk Write Bytes/sec",
                "Composite Disk Read Operations/sec",
                "Composite Disk Write Operations/sec",
            ],
            "P1D",
        )),
        other => Err(Error::UnsupportedResourceType(other.to_string())),
    }
}

#[derive(Debug, Deserialize)]
struct MetricsResponse {
    #[serde(default)]
    value: Vec<Metric>,
}

#[derive(Debug, Deserialize)]
struct Metric {
    name: MetricName,
    #[serde(default)]
    timeseries: Vec<TimeSeries>,
}

#[derive(Debug, Deserialize)]
struct MetricName {
    value: String,
}

#[derive(Debug, Deserialize)]
struct TimeSeries {
    #[serde(default)]
    data: Vec<DataPoint>,
}

#[derive(Debug, Deserialize, Default)]
struct DataPoint {
    #[serde(default)]
    average: Option<f64>,
}

// Sum of the available averages divided by the series count; empty series
// contribute zero.
fn average_metric(timeseries: &[TimeSeries]) -> f64 {
    if timeseries.is_empty() {
        return 0.0;
    }
    let sum: f64 = timeseries
        .iter()
        .flat_map(|series| series.data.iter())
        .filter_map(|point| point.average)
        .sum();
    sum / timeseries.len() as f64
}

/// Client for Azure Monitor metric queries.
pub struct MonitorClient {
    client: Client,
    credential: Arc<TokenCredential>,
    endpoint: Url,
}

impl MonitorClient {
    pub fn new(credential: Arc<TokenCredential>) -> Self {
        Self {
            client: Client::new(),
            credential,
            // The constant is well-formed; parse cannot fail.
            endpoint: Url::parse(DEFAULT_ENDPOINT).unwrap(),
        }
    }

    /// Overrides the management endpoint. Used by tests.
    pub fn with_endpoint(mut self, endpoint: Url) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Queries averaged usage metrics for one resource, filling in
    /// per-resource-type metric and interval defaults when the caller leaves
    /// them unset.
    pub async fn query_usage_metrics(
        &self,
        resource_id: &str,
        resource_type: &str,
        metric_names: Option<Vec<String>>,
        aggregation: &str,
        timespan: &str,
        interval: Option<String>,
    ) -> Result<ResourceUsage> {
        let (default_metrics, default_interval) = metric_defaults(resource_type)?;
        let metric_names = metric_names.unwrap_or_else(|| {
            default_metrics.iter().map(|m| m.to_string()).collect()
        });
        let interval = interval.unwrap_or_else(|| default_interval.to_string());

        let path = format!(
            "{}/providers/microsoft.insights/metrics",
            resource_id.trim_matches('/')
        );
        let mut url = self
            .endpoint
            .join(&path)
            .map_err(|e| Error::Url(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("api-version", API_VERSION)
            .append_pair("metricnames", &metric_names.join(","))
            .append_pair("timespan", timespan)
            .append_pair("interval", &interval)
            .append_pair("aggregation", aggregation);

        let token = self.credential.token().await?;
        debug!(resource_id, resource_type, "Querying usage metrics");

        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()
            .await?
            .error_for_status()?
            .json::<MetricsResponse>()
            .await?;

        let mut metrics = IndexMap::new();
        for metric in response.value {
            metrics.insert(metric.name.value, average_metric(&metric.timeseries));
        }
        Ok(ResourceUsage { resource_id: resource_id.to_string(), metrics })
    }
}
