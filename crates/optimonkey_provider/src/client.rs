use derive_builder::Builder;
use optimonkey_domain::{ChatCompletionMessage, Context};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Url};
use tracing::debug;

use crate::{Request, ResponseFormat, Result};
use crate::{Error, Response};

const API_KEY_HEADER: &str = "api-key";
const DEFAULT_API_VERSION: &str = "2024-06-01";

/// Chat-completions client for an Azure OpenAI deployment.
///
/// Calls `{endpoint}/openai/deployments/{deployment}/chat/completions` with
/// the `api-key` header scheme.
#[derive(Clone, Builder)]
pub struct AzureOpenAi {
    #[builder(default = "Client::new()")]
    client: Client,
    endpoint: Url,
    #[builder(setter(into))]
    api_key: String,
    #[builder(setter(into), default = "DEFAULT_API_VERSION.to_string()")]
    api_version: String,
    #[builder(setter(into))]
    deployment: String,
}

impl AzureOpenAi {
    pub fn builder() -> AzureOpenAiBuilder {
        AzureOpenAiBuilder::default()
    }

    fn url(&self) -> Result<Url> {
        let path = format!(
            "openai/deployments/{}/chat/completions",
            self.deployment
        );
        let mut url = self
            .endpoint
            .join(&path)
            .map_err(|e| Error::Url(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("api-version", &self.api_version);
        Ok(url)
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(&self.api_key) {
            headers.insert(API_KEY_HEADER, value);
        }
        headers
    }

    async fn send(&self, request: &Request) -> Result<Response> {
        let url = self.url()?;
        debug!(%url, messages = request.messages.len(), "Sending chat completion request");
        let response = self
            .client
            .post(url)
            .headers(self.headers())
            .json(request)
            .send()
            .await?
            .error_for_status()?
            .json::<Response>()
            .await?;
        Ok(response)
    }

    /// Runs one completion turn for the given context.
    pub async fn chat(&self, context: &Context) -> Result<ChatCompletionMessage> {
        let request = Request::from(context);
        self.send(&request).await?.into_completion()
    }

    /// Runs a completion constrained to a JSON object and returns the raw
    /// content for the caller to decode.
    pub async fn chat_json(&self, context: &Context) -> Result<String> {
        let mut request = Request::from(context);
        request.response_format = Some(ResponseFormat::json_object());
        let completion = self.send(&request).await?.into_completion()?;
        completion.content.ok_or(Error::MissingContent)
    }
}

#[cfg(test)]
mod tests {
    use optimonkey_domain::ContextMessage;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn fixture_client(endpoint: &str) -> AzureOpenAi {
        AzureOpenAi::builder()
            .endpoint(Url::parse(endpoint).unwrap())
            .api_key("test-key")
            .deployment("gpt-4o-mini")
            .build()
            .unwrap()
    }

    #[test]
    fn test_url_includes_deployment_and_api_version() {
        let client = fixture_client("https://example.openai.azure.com/");
        let actual = client.url().unwrap().to_string();
        let expected = "https://example.openai.azure.com/openai/deployments/gpt-4o-mini/chat/completions?api-version=2024-06-01";
        assert_eq!(actual, expected);
    }

    #[tokio::test]
    async fn test_chat_round_trip() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/openai/deployments/gpt-4o-mini/chat/completions")
            .match_query(mockito::Matcher::Any)
            .match_header(API_KEY_HEADER, "test-key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "choices": [{"message": {"content": "TERMINATE"}, "finish_reason": "stop"}]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = fixture_client(&server.url());
        let context = Context::default().add_message(ContextMessage::user("wrap up"));
        let actual = client.chat(&context).await.unwrap();

        mock.assert_async().await;
        assert_eq!(actual.content.as_deref(), Some("TERMINATE"));
    }

    #[tokio::test]
    async fn test_http_error_surfaces_as_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/openai/deployments/gpt-4o-mini/chat/completions")
            .match_query(mockito::Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let client = fixture_client(&server.url());
        let context = Context::default().add_message(ContextMessage::user("hi"));
        let actual = client.chat(&context).await;
        assert!(matches!(actual, Err(Error::Http(_))));
    }
}
