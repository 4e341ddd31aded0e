use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;

/// Azure OpenAI connection settings. All four values come from the standard
/// `AZURE_OPENAI_*` variables.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub endpoint: String,
    pub deployment: String,
    pub api_version: Option<String>,
}

/// Service-principal credentials for Resource Graph and Monitor access.
#[derive(Debug, Clone)]
pub struct AzureCredentials {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
}

/// Server configuration loaded from environment variables. Both the OpenAI
/// and Azure credential groups are optional; the service degrades rather
/// than refusing to start when one is absent.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub openai: Option<OpenAiConfig>,
    pub credentials: Option<AzureCredentials>,
    pub subscription_id: Option<String>,
    pub output_dir: PathBuf,
    pub analysis_days: u32,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let bind_addr = env_opt("OPTIMONKEY_BIND_ADDR")
            .unwrap_or_else(|| "0.0.0.0:8000".to_string())
            .parse()
            .context("invalid OPTIMONKEY_BIND_ADDR")?;

        let openai = match (
            env_opt("AZURE_OPENAI_API_KEY"),
            env_opt("AZURE_OPENAI_ENDPOINT"),
            env_opt("AZURE_OPENAI_DEPLOYMENT"),
        ) {
            (Some(api_key), Some(endpoint), Some(deployment)) => Some(OpenAiConfig {
                api_key,
                endpoint,
                deployment,
                api_version: env_opt("AZURE_OPENAI_API_VERSION"),
            }),
            _ => None,
        };

        let credentials = match (
            env_opt("AZURE_TENANT_ID"),
            env_opt("AZURE_CLIENT_ID"),
            env_opt("AZURE_CLIENT_SECRET"),
        ) {
            (Some(tenant_id), Some(client_id), Some(client_secret)) => Some(AzureCredentials {
                tenant_id,
                client_id,
                client_secret,
            }),
            _ => None,
        };

        let analysis_days = match env_opt("OPTIMONKEY_ANALYSIS_DAYS") {
            Some(value) => value.parse().context("invalid OPTIMONKEY_ANALYSIS_DAYS")?,
            None => 30,
        };

        Ok(Self {
            bind_addr,
            openai,
            credentials,
            subscription_id: env_opt("AZURE_SUBSCRIPTION_ID"),
            output_dir: env_opt("OPTIMONKEY_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
            analysis_days,
        })
    }
}

/// Reads a variable, treating empty values as unset.
fn env_opt(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
