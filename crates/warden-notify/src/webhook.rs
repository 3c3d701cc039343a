use tracing::{info, warn};
use warden_core::{AlertEvent, WardenError, WardenResult};

/// JSON webhook delivery, mainly for the community Discord. Discord
/// webhook URLs get a `content` payload; anything else receives the raw
/// alert event.
pub struct WebhookNotifier {
    client: reqwest::Client,
    urls: Vec<String>,
}

impl WebhookNotifier {
    pub fn new(urls: Vec<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            urls,
        }
    }

    pub async fn send(&self, event: &AlertEvent) -> WardenResult<()> {
        let payload = serde_json::to_value(event).map_err(|e| WardenError::Notify(e.to_string()))?;

        for url in &self.urls {
            match self.post_webhook(url, event, &payload).await {
                Ok(_) => info!(url = %url, alert_id = %event.id, "webhook delivered"),
                Err(e) => warn!(url = %url, error = %e, "webhook delivery failed"),
            }
        }
        Ok(())
    }

    async fn post_webhook(
        &self,
        url: &str,
        event: &AlertEvent,
        payload: &serde_json::Value,
    ) -> WardenResult<()> {
        let is_discord = url.contains("discord.com/api/webhooks");

        let body = if is_discord {
            self.format_discord(event)
        } else {
            payload.clone()
        };

        let resp = self
            .client
            .post(url)
            .json(&body)
            .timeout(std::time::Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| WardenError::Notify(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(WardenError::Notify(format!(
                "webhook returned {}",
                resp.status()
            )));
        }
        Ok(())
    }

    fn format_discord(&self, event: &AlertEvent) -> serde_json::Value {
        serde_json::json!({
            "content": format!("**[{:?}] {}**\n{}", event.severity, event.title, event.detail),
        })
    }
}
