//! Notification Sink.
//!
//! Handlers call [`NotificationSink::notify`] after their unit of work has
//! committed. Delivery happens on a spawned task, so a slow or failing
//! endpoint never delays the response and never touches stored state.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use till_core::Event;

use crate::config::ApiConfig;

/// Receives committed business events.
pub trait NotificationSink: Send + Sync {
    /// Hands off `event` without waiting for delivery.
    fn notify(&self, event: Event);
}

/// POSTs each event as JSON to one configured URL.
#[derive(Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Falling back to default HTTP client for notifications");
                reqwest::Client::new()
            });

        WebhookNotifier {
            client,
            url: url.into(),
        }
    }

    async fn deliver(&self, event: &Event) -> Result<(), reqwest::Error> {
        self.client
            .post(&self.url)
            .json(event)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

impl NotificationSink for WebhookNotifier {
    fn notify(&self, event: Event) {
        let notifier = self.clone();

        tokio::spawn(async move {
            match notifier.deliver(&event).await {
                Ok(()) => debug!(event = event.name(), "Notification delivered"),
                Err(e) => warn!(event = event.name(), error = %e, "Notification delivery failed"),
            }
        });
    }
}

/// Used when no webhook is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledNotifier;

impl NotificationSink for DisabledNotifier {
    fn notify(&self, event: Event) {
        debug!(event = event.name(), "Notifications disabled, dropping event");
    }
}

/// Builds the sink described by `config`.
pub fn from_config(config: &ApiConfig) -> Arc<dyn NotificationSink> {
    match config.webhook_url() {
        Some(url) => {
            info!(url, "Notifications enabled");
            Arc::new(WebhookNotifier::new(url, config.notification_timeout()))
        }
        None => Arc::new(DisabledNotifier),
    }
}

/// Keeps every event in memory so tests can assert on them.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: std::sync::Mutex<Vec<Event>>,
}

#[cfg(test)]
impl RecordingNotifier {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }
}

#[cfg(test)]
impl NotificationSink for RecordingNotifier {
    fn notify(&self, event: Event) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_webhook_is_not_fatal() {
        let notifier = WebhookNotifier::new("http://127.0.0.1:9/hook", Duration::from_millis(200));
        let event = Event::UserCreated(till_core::events::UserCreated {
            id: 1,
            name: "Ana Reyes".to_string(),
            email: "ana@till.local".to_string(),
            role: till_core::Role::Cashier,
            employee_id: "EMP-0002".to_string(),
            created_at: chrono::Utc::now(),
        });

        notifier.notify(event);
        tokio::time::sleep(Duration::from_millis(300)).await;
    }

    #[test]
    fn test_from_config_without_url_is_disabled() {
        let sink = from_config(&ApiConfig::default());
        sink.notify(Event::UserCreated(till_core::events::UserCreated {
            id: 1,
            name: "Ana Reyes".to_string(),
            email: "ana@till.local".to_string(),
            role: till_core::Role::Cashier,
            employee_id: "EMP-0002".to_string(),
            created_at: chrono::Utc::now(),
        }));
    }
}
