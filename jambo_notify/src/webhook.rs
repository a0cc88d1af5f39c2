use async_trait::async_trait;
use jambo_core::{EscalationNotice, Notifier};
use reqwest::Client;
use serde_json::json;
use tracing::debug;

/// POSTs the lead as JSON.
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    #[must_use]
    pub fn new(url: String) -> Self {
        Self {
            client: Client::new(),
            url,
        }
    }

    #[must_use]
    pub fn payload(notice: &EscalationNotice) -> serde_json::Value {
        let details: serde_json::Map<String, serde_json::Value> = notice
            .fields()
            .into_iter()
            .map(|(category, value)| (category.to_string(), json!(value)))
            .collect();
        json!({
            "subject": notice.subject(),
            "conversationId": notice.conversation_id.to_string(),
            "contactAddress": notice.contact_address,
            "customerName": notice.customer_name,
            "serviceType": notice.service_type.label(),
            "language": notice.language.code(),
            "details": details,
            "clientDetails": notice.details,
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, notice: &EscalationNotice) -> anyhow::Result<()> {
        self.client
            .post(&self.url)
            .json(&Self::payload(notice))
            .send()
            .await?
            .error_for_status()?;
        debug!("Webhook accepted lead for {}", notice.contact_address);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::notice;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn posts_the_lead() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/leads"))
            .and(body_partial_json(json!({
                "contactAddress": "254700000001",
                "customerName": "Amina",
                "serviceType": "visa",
                "details": {"destination": "Dubai", "nationality": "Kenyan"}
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = WebhookNotifier::new(format!("{}/leads", server.uri()));
        assert!(notifier.notify(&notice()).await.is_ok());
    }

    #[tokio::test]
    async fn rejected_post_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let notifier = WebhookNotifier::new(server.uri());
        assert!(notifier.notify(&notice()).await.is_err());
    }
}
