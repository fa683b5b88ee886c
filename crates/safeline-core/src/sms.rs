//! SMS transport
//!
//! The only place that knows the provider's failure surface. Everything it
//! returns is consumed by [`crate::notify::NotificationDispatcher`].

use crate::config::SmsConfig;
use crate::error::{ConfigError, SmsError};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// Outbound text message transport
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SmsTransport: Send + Sync {
    /// Submit one message; returns the provider's response body
    async fn send_message(&self, to: &str, from: &str, body: &str) -> Result<Value, SmsError>;
}

/// Vonage (Nexmo) `sms/json` client
#[derive(Debug, Clone)]
pub struct NexmoTransport {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    api_secret: String,
}

impl NexmoTransport {
    /// Build from configuration; credentials are mandatory
    ///
    /// # Errors
    /// - `ConfigError::Invalid` if credentials are missing or the client cannot be built
    pub fn new(config: &SmsConfig) -> Result<Self, ConfigError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| ConfigError::Invalid("sms.api_key is not set".to_string()))?;
        let api_secret = config
            .api_secret
            .clone()
            .ok_or_else(|| ConfigError::Invalid("sms.api_secret is not set".to_string()))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ConfigError::Invalid(format!("sms client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key,
            api_secret,
        })
    }
}

#[async_trait]
impl SmsTransport for NexmoTransport {
    async fn send_message(&self, to: &str, from: &str, body: &str) -> Result<Value, SmsError> {
        let response: Value = self
            .client
            .post(&self.endpoint)
            .form(&[
                ("api_key", self.api_key.as_str()),
                ("api_secret", self.api_secret.as_str()),
                ("from", from),
                ("to", to),
                ("text", body),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        check_delivery(&response)?;
        Ok(response)
    }
}

/// Nexmo answers 200 even for refused messages; the verdict is per message.
fn check_delivery(response: &Value) -> Result<(), SmsError> {
    let messages = response
        .get("messages")
        .and_then(Value::as_array)
        .ok_or_else(|| SmsError::Malformed("missing 'messages'".to_string()))?;

    if messages.is_empty() {
        return Err(SmsError::Malformed("empty 'messages'".to_string()));
    }

    for message in messages {
        let status = message.get("status").and_then(Value::as_str).unwrap_or("");
        if status != "0" {
            let text = message
                .get("error-text")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            return Err(SmsError::Rejected {
                status: status.to_string(),
                message: text.to_string(),
            });
        }
    }
    Ok(())
}
