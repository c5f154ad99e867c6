use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use crate::application::notifications::NotificationProvider;
use crate::domain::value_objects::lifecycle_events::LifecycleEvent;

/// Posts lifecycle events as JSON to a configured endpoint (typically the
/// mail service that renders subscriber emails).
pub struct LifecycleWebhookProvider {
    webhook_url: Url,
    client: Client,
}

impl LifecycleWebhookProvider {
    pub fn new(webhook_url: Url) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(3))
            .build()
            .expect("reqwest client must build");

        Self {
            webhook_url,
            client,
        }
    }
}

#[async_trait]
impl NotificationProvider for LifecycleWebhookProvider {
    async fn send(&self, event: &LifecycleEvent) -> Result<()> {
        let response = self
            .client
            .post(self.webhook_url.clone())
            .json(event)
            .send()
            .await
            .map_err(sanitize_reqwest_error)?;

        if response.status().is_success() {
            return Ok(());
        }

        Err(anyhow!(
            "notification webhook returned non-success status: {}",
            response.status()
        ))
    }

    fn provider_name(&self) -> &'static str {
        "lifecycle-webhook"
    }
}

fn sanitize_reqwest_error(error: reqwest::Error) -> anyhow::Error {
    if error.is_timeout() {
        return anyhow!("notification webhook request timed out");
    }
    if error.is_connect() {
        return anyhow!("notification webhook connection failed");
    }
    anyhow!("notification webhook request failed")
}
