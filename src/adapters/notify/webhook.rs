//! Webhook outcome notifier

use super::OutcomeNotifier;
use crate::core::outcome::JobOutcome;
use crate::domain::{Result, ShelfportError};
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use std::time::Duration;

/// POSTs the outcome as JSON to a status-store URL
///
/// Any non-2xx answer counts as a failed delivery. No retries are made.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    url: String,
    client: Client,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout_seconds: u64) -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| {
                ShelfportError::Configuration(format!("Failed to build webhook client: {e}"))
            })?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }
}

#[async_trait]
impl OutcomeNotifier for WebhookNotifier {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn notify(&self, outcome: &JobOutcome) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .json(outcome)
            .send()
            .await
            .map_err(|e| ShelfportError::Io(format!("webhook {}: {e}", self.url)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ShelfportError::Io(format!(
                "webhook {} answered {status}: {body}",
                self.url
            )));
        }

        tracing::debug!(job_id = %outcome.job_id, url = %self.url, "Delivered job outcome");
        Ok(())
    }
}
