//! Notification dispatcher
//!
//! Formats the alert, hands it to the SMS transport once, and reports the
//! outcome as a value. A failed delivery is still a valid, persistable
//! incident, so this module never returns an error.

use crate::sms::SmsTransport;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Latitude/longitude pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    /// Google Maps link pointing at these coordinates
    #[must_use]
    pub fn map_link(&self) -> String {
        format!(
            "https://www.google.com/maps/search/?api=1&query={},{}",
            self.lat, self.lng
        )
    }
}

/// Everything needed to alert one contact
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub recipient_name: String,
    pub recipient_phone: String,
    pub sender_name: String,
    pub sender_phone: String,
    pub location_name: String,
    pub coordinates: Coordinates,
}

impl Notification {
    /// Human readable alert text
    #[must_use]
    pub fn message(&self) -> String {
        format!(
            "Hi {}, {} may be in danger and needs your help. Last known location: {} ({}). \
             Call them at {}.",
            self.recipient_name,
            self.sender_name,
            self.location_name,
            self.coordinates.map_link(),
            self.sender_phone,
        )
    }
}

/// Outcome of one delivery attempt
#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryResult {
    /// Transport accepted the message
    Delivered {
        /// Raw provider response
        provider_response: Value,
    },
    /// Transport failed; the reason is kept for logs only
    Failed {
        /// Transport error description
        reason: String,
    },
}

impl DeliveryResult {
    /// Whether the contact was reached
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }
}

/// Sends incident alerts through an [`SmsTransport`]
#[derive(Clone)]
pub struct NotificationDispatcher {
    transport: Arc<dyn SmsTransport>,
    sender_id: Option<String>,
}

impl std::fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationDispatcher")
            .field("sender_id", &self.sender_id)
            .finish_non_exhaustive()
    }
}

impl NotificationDispatcher {
    /// Create dispatcher; `sender_id` overrides the SMS `from` field
    #[must_use]
    pub fn new(transport: Arc<dyn SmsTransport>, sender_id: Option<String>) -> Self {
        Self {
            transport,
            sender_id,
        }
    }

    /// Attempt delivery exactly once
    pub async fn send(&self, notification: &Notification) -> DeliveryResult {
        let from = self
            .sender_id
            .as_deref()
            .unwrap_or(&notification.sender_phone);
        let body = notification.message();

        match self
            .transport
            .send_message(&notification.recipient_phone, from, &body)
            .await
        {
            Ok(provider_response) => {
                tracing::info!("SMS delivered to contact {}", notification.recipient_name);
                DeliveryResult::Delivered { provider_response }
            }
            Err(e) => {
                tracing::warn!("SMS delivery failed: {}", e);
                DeliveryResult::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SmsError;
    use crate::sms::MockSmsTransport;
    use serde_json::json;

    fn notification() -> Notification {
        Notification {
            recipient_name: "Sam".to_string(),
            recipient_phone: "+15550100".to_string(),
            sender_name: "Alex Doe".to_string(),
            sender_phone: "+15550101".to_string(),
            location_name: "Alexanderplatz, Berlin".to_string(),
            coordinates: Coordinates {
                lat: 52.5219,
                lng: 13.4132,
            },
        }
    }

    #[test]
    fn message_embeds_sender_link_and_place() {
        let text = notification().message();
        assert!(text.contains("Alex Doe"));
        assert!(text.contains("Alexanderplatz, Berlin"));
        assert!(text.contains("query=52.5219,13.4132"));
        assert!(text.contains("+15550101"));
    }

    #[tokio::test]
    async fn transport_success_is_delivered() {
        let mut transport = MockSmsTransport::new();
        transport
            .expect_send_message()
            .withf(|to, from, _| to == "+15550100" && from == "+15550101")
            .times(1)
            .returning(|_, _, _| Ok(json!({ "messages": [{ "status": "0" }] })));

        let dispatcher = NotificationDispatcher::new(Arc::new(transport), None);
        let result = dispatcher.send(&notification()).await;

        assert!(result.is_success());
    }

    #[tokio::test]
    async fn transport_failure_is_a_value() {
        let mut transport = MockSmsTransport::new();
        transport.expect_send_message().times(1).returning(|_, _, _| {
            Err(SmsError::Rejected {
                status: "9".to_string(),
                message: "Partner quota exceeded".to_string(),
            })
        });

        let dispatcher = NotificationDispatcher::new(Arc::new(transport), None);
        let result = dispatcher.send(&notification()).await;

        assert!(matches!(result, DeliveryResult::Failed { ref reason } if reason.contains("quota")));
    }

    #[tokio::test]
    async fn sender_id_overrides_from() {
        let mut transport = MockSmsTransport::new();
        transport
            .expect_send_message()
            .withf(|_, from, _| from == "SafeLine")
            .times(1)
            .returning(|_, _, _| Ok(json!({})));

        let dispatcher = NotificationDispatcher::new(Arc::new(transport), Some("SafeLine".to_string()));
        assert!(dispatcher.send(&notification()).await.is_success());
    }
}
