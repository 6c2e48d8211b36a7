use async_trait::async_trait;
use futures::future::join_all;

use super::traits::{NotificationEvent, NotifierPlugin};

pub type NotifierPluginBox = Box<dyn NotifierPlugin>;

/// Per-channel outcome of one dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub attempted: usize,
    pub delivered: usize,
    /// `(channel type, error)` for every channel that did not deliver.
    pub failures: Vec<(String, String)>,
}

impl DispatchSummary {
    pub fn all_delivered(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn any_delivered(&self) -> bool {
        self.delivered > 0
    }
}

/// Where the monitor hands in-stock events.
///
/// Implementations never fail the caller: channel errors are reported in the
/// summary and the monitor treats the item as notified either way.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify_in_stock(&self, event: &NotificationEvent) -> DispatchSummary;
}

/// Fans one event out to every configured channel.
#[derive(Default)]
pub struct NotificationManager {
    notifiers: Vec<NotifierPluginBox>,
}

impl NotificationManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a notifier plugin
    pub fn register(&mut self, plugin: NotifierPluginBox) {
        tracing::debug!("Registered {} channel", plugin.plugin_type());
        self.notifiers.push(plugin);
    }

    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.notifiers.len()
    }

    pub fn channel_types(&self) -> Vec<String> {
        self.notifiers
            .iter()
            .map(|n| n.plugin_type().to_string())
            .collect()
    }

    /// Send a test message through every channel.
    pub async fn send_test(&self) -> DispatchSummary {
        let event = NotificationEvent::test(chrono::Utc::now());
        self.dispatch(&event).await
    }

    pub async fn dispatch(&self, event: &NotificationEvent) -> DispatchSummary {
        let mut summary = DispatchSummary {
            attempted: self.notifiers.len(),
            ..Default::default()
        };

        if self.notifiers.is_empty() {
            return summary;
        }

        let sends = self.notifiers.iter().map(|notifier| async move {
            let outcome = match notifier.notify(event).await {
                Ok(result) if result.success => Ok(result.message_id),
                Ok(result) => Err(result.error.unwrap_or_else(|| "unknown error".to_string())),
                Err(e) => Err(e.to_string()),
            };
            (notifier.plugin_type().to_string(), outcome)
        });

        for (channel, outcome) in join_all(sends).await {
            match outcome {
                Ok(message_id) => {
                    tracing::info!(
                        "{} notification sent for {} ({})",
                        channel,
                        event.url,
                        message_id.as_deref().unwrap_or("no id")
                    );
                    metrics::counter!("restock_notifications_total", "outcome" => "delivered").increment(1);
                    summary.delivered += 1;
                }
                Err(error) => {
                    tracing::error!("{} notification failed for {}: {}", channel, event.url, error);
                    metrics::counter!("restock_notifications_total", "outcome" => "failed").increment(1);
                    summary.failures.push((channel, error));
                }
            }
        }

        summary
    }
}

#[async_trait]
impl NotificationSink for NotificationManager {
    async fn notify_in_stock(&self, event: &NotificationEvent) -> DispatchSummary {
        self.dispatch(event).await
    }
}
