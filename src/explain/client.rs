use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use super::{Completer, CompletionError};
use crate::config::CompletionConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_TOKENS: u32 = 200;
const TEMPERATURE: f32 = 0.3;

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    prompt: &'a str,
    max_tokens: u32,
    temperature: f32,
    model: &'a str,
    stop: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    text: String,
}

/// OpenAI-style `/v1/completions` client.
#[derive(Clone)]
pub struct CompletionClient {
    http: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
}

impl CompletionClient {
    pub fn new(url: &str, api_key: &str, model: &str) -> Result<Self, CompletionError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            url: url.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }

    /// `Ok(None)` when no API key is configured.
    pub fn from_config(cfg: &CompletionConfig) -> Result<Option<Self>, CompletionError> {
        match cfg.api_key.as_deref() {
            Some(key) => Self::new(&cfg.api_url, key, &cfg.model).map(Some),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl Completer for CompletionClient {
    #[instrument(skip(self, prompt), fields(model = %self.model))]
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let body = CompletionRequest {
            prompt,
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
            model: &self.model,
            stop: ["\n\n\n"],
        };
        let resp = self
            .http
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            warn!(%status, "completion endpoint returned an error status");
            return Err(CompletionError::Upstream(status.as_u16()));
        }

        let parsed: CompletionResponse = resp.json().await?;
        let text = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.text.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(CompletionError::EmptyResponse)?;
        debug!(chars = text.len(), "completion received");
        Ok(text)
    }
}

#[cfg(test)]
mod client_tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> CompletionClient {
        CompletionClient::new(&format!("{}/v1/completions", server.uri()), "test-key", "llama3.3-70b")
            .unwrap()
    }

    #[test]
    fn request_body_shape() {
        let body = CompletionRequest {
            prompt: "hi",
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
            model: "llama3.3-70b",
            stop: ["\n\n\n"],
        };
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["max_tokens"], 200);
        assert_eq!(v["model"], "llama3.3-70b");
        assert_eq!(v["stop"][0], "\n\n\n");
    }

    #[test]
    fn missing_key_means_no_client() {
        let cfg = CompletionConfig {
            api_url: "http://localhost/v1/completions".into(),
            api_key: None,
            model: "m".into(),
        };
        assert!(CompletionClient::from_config(&cfg).unwrap().is_none());
    }

    #[tokio::test]
    async fn posts_bearer_key_and_trims_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({ "prompt": "Explain E471", "max_tokens": 200 })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "choices": [{ "text": "  Mono- and diglycerides.\n" }] })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let text = client_for(&server).complete("Explain E471").await.unwrap();
        assert_eq!(text, "Mono- and diglycerides.");
    }

    #[tokio::test]
    async fn error_status_is_upstream() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = client_for(&server).complete("hi").await.unwrap_err();
        assert!(matches!(err, CompletionError::Upstream(500)));
    }

    #[tokio::test]
    async fn no_choices_or_blank_text_is_empty_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
            .mount(&server)
            .await;
        let err = client_for(&server).complete("hi").await.unwrap_err();
        assert!(matches!(err, CompletionError::EmptyResponse));

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [{ "text": "   " }] })))
            .mount(&server)
            .await;
        let err = client_for(&server).complete("hi").await.unwrap_err();
        assert!(matches!(err, CompletionError::EmptyResponse));
    }
}
