use std::time::{Duration, Instant};

use reqwest::{Client, Url};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::debug;

use crate::{Error, Result};

const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com/";
const MANAGEMENT_SCOPE: &str = "https://management.azure.com/.default";

/// Tokens are refreshed this long before their reported expiry.
const EXPIRY_LEEWAY: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    token: String,
    expires_at: Instant,
}

/// AAD client-credentials token source for the Azure management plane, with
/// an in-process cache keyed to the token's expiry.
pub struct TokenCredential {
    client: Client,
    authority: Url,
    tenant_id: String,
    client_id: String,
    client_secret: String,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenCredential {
    pub fn new(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            // The constant is well-formed; parse cannot fail.
            authority: Url::parse(DEFAULT_AUTHORITY).unwrap(),
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            cached: Mutex::new(None),
        }
    }

    /// Overrides the AAD authority host. Used by tests.
    pub fn with_authority(mut self, authority: Url) -> Self {
        self.authority = authority;
        self
    }

    /// Returns a bearer token for `https://management.azure.com`, fetching a
    /// fresh one only when the cached token is close to expiry.
    pub async fn token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;
        if let Some(entry) = cached.as_ref() {
            if entry.expires_at > Instant::now() + EXPIRY_LEEWAY {
                return Ok(entry.token.clone());
            }
        }

        debug!(tenant = %self.tenant_id, "Requesting management-plane token");
        let url = self
            .authority
            .join(&format!("{}/oauth2/v2.0/token", self.tenant_id))
            .map_err(|e| Error::Url(e.to_string()))?;
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", MANAGEMENT_SCOPE),
        ];
        let response = self
            .client
            .post(url)
            .form(&form)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| Error::Auth(e.to_string()))?
            .json::<TokenResponse>()
            .await?;

        let token = response.access_token.clone();
        *cached = Some(CachedToken {
            token: response.access_token,
            expires_at: Instant::now() + Duration::from_secs(response.expires_in),
        });
        Ok(token)
    }
}
