use crate::config::WebhookConfig;
use crate::plugins::traits::{EventKind, NotificationEvent, NotificationResult, NotifierPlugin};
use crate::utils::error::AppError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

const IN_STOCK_COLOR: u32 = 0x4caf50;
const TEST_COLOR: u32 = 0x0099ff;

#[derive(Debug, Clone)]
pub struct WebhookOptions {
    pub webhook_url: String,
    pub username: Option<String>,
    pub timeout: Duration,
}

impl WebhookOptions {
    pub fn from_settings(webhook: &WebhookConfig, timeout: Duration) -> Result<Self, String> {
        let webhook_url = webhook.url.as_deref().ok_or("Missing webhook_url")?;

        if url::Url::parse(webhook_url).is_err() {
            return Err(format!("Invalid webhook URL: {}", webhook_url));
        }

        Ok(WebhookOptions {
            webhook_url: webhook_url.to_string(),
            username: Some(webhook.username.trim().to_string()).filter(|name| !name.is_empty()),
            timeout,
        })
    }
}

/// Posts Discord-compatible embed payloads to a webhook URL.
pub struct WebhookNotifier {
    options: WebhookOptions,
    client: Client,
}

impl WebhookNotifier {
    pub fn new(options: WebhookOptions) -> Result<Self, AppError> {
        let client = Client::builder().timeout(options.timeout).build()?;
        Ok(WebhookNotifier { options, client })
    }

    fn create_embed(&self, event: &NotificationEvent) -> serde_json::Value {
        let (title, color) = match event.kind {
            EventKind::InStock => (format!("🛍️ {} is back in stock", event.product_name()), IN_STOCK_COLOR),
            EventKind::Test => (event.subject(), TEST_COLOR),
        };

        let mut fields = Vec::new();
        if let Some(product) = &event.product {
            if let Some(price) = &product.price {
                fields.push(json!({ "name": "💰 Price", "value": price, "inline": true }));
            }
            if let Some(id) = &product.product_id {
                fields.push(json!({ "name": "🏷️ Web ID", "value": id, "inline": true }));
            }
        }

        let mut embed = json!({
            "title": title,
            "color": color,
            "timestamp": event.detected_at.to_rfc3339(),
            "fields": fields,
            "footer": { "text": "Restock Watcher" }
        });

        match event.kind {
            EventKind::InStock => embed["url"] = json!(event.url),
            EventKind::Test => embed["description"] = json!(event.body()),
        }

        embed
    }

    fn create_webhook_payload(&self, event: &NotificationEvent) -> serde_json::Value {
        let mut payload = json!({
            "embeds": [self.create_embed(event)]
        });

        if let Some(username) = &self.options.username {
            payload["username"] = json!(username);
        }

        payload
    }
}

#[async_trait]
impl NotifierPlugin for WebhookNotifier {
    fn name(&self) -> &str {
        "Webhook Notifier"
    }

    fn plugin_type(&self) -> &str {
        "webhook"
    }

    async fn notify(&self, event: &NotificationEvent) -> Result<NotificationResult, Box<dyn std::error::Error + Send + Sync>> {
        let payload = self.create_webhook_payload(event);

        let response = self
            .client
            .post(&self.options.webhook_url)
            .json(&payload)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(NotificationResult::delivered(format!("webhook-{}", event.id)))
        } else {
            Ok(NotificationResult::failed(format!("Webhook returned {}", response.status())))
        }
    }
}
