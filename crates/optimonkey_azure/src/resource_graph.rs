use std::sync::Arc;

use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::{Error, Result, TokenCredential};

const DEFAULT_ENDPOINT: &str = "https://management.azure.com/";
const API_VERSION: &str = "2021-03-01";

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    data: Vec<Value>,
    #[serde(default, rename = "totalRecords")]
    total_records: Option<u64>,
}

/// Client for Azure Resource Graph KQL queries.
pub struct ResourceGraphClient {
    client: Client,
    credential: Arc<TokenCredential>,
    endpoint: Url,
}

impl ResourceGraphClient {
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

    /// Runs a KQL query against the given subscriptions and returns the raw
    /// result rows.
    pub async fn resources(&self, query: &str, subscriptions: &[String]) -> Result<Vec<Value>> {
        let mut url = self
            .endpoint
            .join("providers/Microsoft.ResourceGraph/resources")
            .map_err(|e| Error::Url(e.to_string()))?;
        url.query_pairs_mut().append_pair("api-version", API_VERSION);

        let token = self.credential.token().await?;
        debug!(%query, subscriptions = subscriptions.len(), "Running Resource Graph query");

        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .json(&json!({"query": query, "subscriptions": subscriptions}))
            .send()
            .await?
            .error_for_status()?
            .json::<QueryResponse>()
            .await?;

        info!(
            rows = response.data.len(),
            total = ?response.total_records,
            "Resource Graph query completed"
        );
        Ok(response.data)
    }
}
