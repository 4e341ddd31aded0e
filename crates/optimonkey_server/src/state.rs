use std::sync::Arc;

use anyhow::Context;
use optimonkey_app::{ConversationEngine, SessionRegistry, ToolRegistry};
use optimonkey_azure::{MonitorClient, ResourceGraphClient, TokenCredential};
use optimonkey_provider::AzureOpenAi;
use reqwest::Url;
use tracing::{info, warn};

use crate::config::Config;

/// Shared application state. Cloned per handler; everything inside is an
/// [`Arc`].
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SessionRegistry>,
    pub engine: Arc<ConversationEngine>,
}

impl AppState {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let provider = match &config.openai {
            Some(openai) => {
                info!(deployment = %openai.deployment, "Azure OpenAI client configured");
                let endpoint = Url::parse(&openai.endpoint)
                    .context("invalid AZURE_OPENAI_ENDPOINT")?;
                let mut builder = AzureOpenAi::builder();
                builder
                    .endpoint(endpoint)
                    .api_key(openai.api_key.clone())
                    .deployment(openai.deployment.clone());
                if let Some(version) = &openai.api_version {
                    builder.api_version(version.clone());
                }
                Some(Arc::new(
                    builder.build().context("invalid Azure OpenAI configuration")?,
                ))
            }
            None => {
                warn!("AZURE_OPENAI_* not set; prompt validation falls back to heuristics");
                None
            }
        };

        let (resource_graph, monitor) = match &config.credentials {
            Some(creds) => {
                info!(tenant_id = %creds.tenant_id, "Azure management clients configured");
                let credential = Arc::new(TokenCredential::new(
                    creds.tenant_id.clone(),
                    creds.client_id.clone(),
                    creds.client_secret.clone(),
                ));
                (
                    Some(ResourceGraphClient::new(credential.clone())),
                    Some(MonitorClient::new(credential)),
                )
            }
            None => {
                warn!("AZURE_TENANT_ID/CLIENT_ID/CLIENT_SECRET not set; tools run offline");
                (None, None)
            }
        };

        let tools = Arc::new(ToolRegistry::new(
            resource_graph,
            monitor,
            config.subscription_id.clone(),
            config.output_dir.clone(),
        ));

        let engine = Arc::new(ConversationEngine::new(
            provider,
            tools,
            config.subscription_id.clone(),
            config.analysis_days,
        ));

        Ok(Self { registry: Arc::new(SessionRegistry::new()), engine })
    }
}
