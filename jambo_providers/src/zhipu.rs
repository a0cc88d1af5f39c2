use std::time::Duration;

use async_trait::async_trait;
use jambo_core::{CompletionProvider, Prompt};
use reqwest::{Client, StatusCode};
use serde_json::json;
use tracing::{debug, info};

use crate::retry::retry_with_backoff;

const DEFAULT_BASE_URL: &str = "https://open.bigmodel.cn/api/paas/v4";

/// Chat-completions client for Zhipu, or any endpoint speaking the same
/// OpenAI-style protocol.
pub struct ZhipuProvider {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    retry_delays: Vec<Duration>,
}

impl ZhipuProvider {
    pub fn new(api_key: String, model: String) -> Self {
        info!("Creating ZhipuProvider (model: {model})");
        Self {
            client: Client::new(),
            api_key,
            model,
            base_url: DEFAULT_BASE_URL.to_string(),
            retry_delays: vec![Duration::from_secs(1), Duration::from_secs(2)],
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Retries must fit inside the caller's completion timeout.
    #[must_use]
    pub fn with_retry_delays(mut self, delays: Vec<Duration>) -> Self {
        self.retry_delays = delays;
        self
    }

    async fn try_send(&self, request: &serde_json::Value) -> anyhow::Result<String> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?
            .error_for_status()?
            .json::<serde_json::Value>()
            .await?;

        if let Some(usage) = response["usage"].as_object() {
            debug!(
                "Completion usage: prompt={} completion={}",
                usage["prompt_tokens"].as_u64().unwrap_or_default(),
                usage["completion_tokens"].as_u64().unwrap_or_default()
            );
        }

        response["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("Invalid response format: missing content"))
    }
}

/// Client errors other than rate limiting will not improve on retry.
fn is_retryable(error: &anyhow::Error) -> bool {
    error
        .downcast_ref::<reqwest::Error>()
        .and_then(reqwest::Error::status)
        .is_none_or(|status| status == StatusCode::TOO_MANY_REQUESTS || !status.is_client_error())
}

#[async_trait]
impl CompletionProvider for ZhipuProvider {
    async fn complete(&self, prompt: &Prompt) -> anyhow::Result<String> {
        let request = json!({
            "model": self.model,
            "messages": prompt.to_messages(),
        });

        debug!("Sending request to Zhipu API: model={}", self.model);
        let reply =
            retry_with_backoff(|| self.try_send(&request), &self.retry_delays, is_retryable)
                .await?;
        debug!("Received response from Zhipu API ({} chars)", reply.len());
        Ok(reply)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn prompt() -> Prompt {
        Prompt {
            system: "You are a travel consultant.".to_string(),
            body: "Customer: I need a visa to Dubai".to_string(),
        }
    }

    fn completion(content: &str) -> serde_json::Value {
        json!({
            "choices": [{"message": {"role": "assistant", "content": content}}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 8, "total_tokens": 20}
        })
    }

    fn provider(server: &MockServer) -> ZhipuProvider {
        ZhipuProvider::new("test-key".to_string(), "glm-4-flash".to_string())
            .with_base_url(server.uri())
            .with_retry_delays(vec![Duration::from_millis(10), Duration::from_millis(10)])
    }

    #[tokio::test]
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    async fn posts_chat_messages_and_reads_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({
                "model": "glm-4-flash",
                "messages": [
                    {"role": "system", "content": "You are a travel consultant."},
                    {"role": "user", "content": "Customer: I need a visa to Dubai"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("When do you travel?")))
            .expect(1)
            .mount(&server)
            .await;

        let reply = provider(&server)
            .complete(&prompt())
            .await
            .expect("completion should succeed");
        assert_eq!(reply, "When do you travel?");
    }

    #[tokio::test]
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    async fn server_errors_are_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("Karibu!")))
            .mount(&server)
            .await;

        let reply = provider(&server)
            .complete(&prompt())
            .await
            .expect("second attempt should succeed");
        assert_eq!(reply, "Karibu!");
    }

    #[tokio::test]
    async fn bad_credentials_fail_fast() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        assert!(provider(&server).complete(&prompt()).await.is_err());
    }

    #[tokio::test]
    async fn malformed_body_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let err = provider(&server).complete(&prompt()).await;
        assert!(err.is_err_and(|e| e.to_string().contains("missing content")));
    }
}
