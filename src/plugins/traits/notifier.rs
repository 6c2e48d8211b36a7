use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{generate_id, ProductInfo};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    InStock,
    Test,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub id: String,
    pub kind: EventKind,
    pub url: String,
    pub product: Option<ProductInfo>,
    pub detected_at: DateTime<Utc>,
}

impl NotificationEvent {
    pub fn in_stock(url: impl Into<String>, product: Option<ProductInfo>, detected_at: DateTime<Utc>) -> Self {
        Self {
            id: generate_id(),
            kind: EventKind::InStock,
            url: url.into(),
            product: product.filter(|p| !p.is_empty()),
            detected_at,
        }
    }

    pub fn test(detected_at: DateTime<Utc>) -> Self {
        Self {
            id: generate_id(),
            kind: EventKind::Test,
            url: String::new(),
            product: None,
            detected_at,
        }
    }

    /// Product name for headlines, "Item" when nothing is known.
    pub fn product_name(&self) -> String {
        self.product
            .as_ref()
            .and_then(|p| p.display_name())
            .unwrap_or_else(|| "Item".to_string())
    }

    pub fn subject(&self) -> String {
        match self.kind {
            EventKind::InStock => format!("🛍️ In Stock Alert: {}", self.product_name()),
            EventKind::Test => "🧪 Test Notification".to_string(),
        }
    }

    /// Plain-text body shared by every channel. Without product metadata the
    /// message degrades to the URL alone.
    pub fn body(&self) -> String {
        if self.kind == EventKind::Test {
            return "This is a test notification from your Restock Watcher.".to_string();
        }

        let mut text = String::from("Item is now in stock!\n\n");
        if let Some(product) = &self.product {
            if let Some(name) = product.display_name() {
                text.push_str(&format!("Product: {}\n", name));
            }
            if let Some(price) = &product.price {
                text.push_str(&format!("Price: {}\n", price));
            }
            if let Some(id) = &product.product_id {
                text.push_str(&format!("Web ID: {}\n", id));
            }
        }
        text.push_str(&format!("URL: {}", self.url));
        text
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationResult {
    pub success: bool,
    pub message_id: Option<String>,
    pub error: Option<String>,
}

impl NotificationResult {
    pub fn delivered(message_id: impl Into<String>) -> Self {
        Self {
            success: true,
            message_id: Some(message_id.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message_id: None,
            error: Some(error.into()),
        }
    }
}

/// A single delivery channel (email, SMS, webhook).
#[async_trait]
pub trait NotifierPlugin: Send + Sync {
    /// Plugin metadata
    fn name(&self) -> &str;
    fn plugin_type(&self) -> &str;

    async fn notify(&self, event: &NotificationEvent) -> Result<NotificationResult, Box<dyn std::error::Error + Send + Sync>>;
}
