//! Channel transport implementations for the driver.
//!
//! `ConsoleTransport` logs sends for local runs and demos; the step still
//! records a receipt so delivery webhooks can be simulated against it.
//! `HttpRelayTransport` posts the dispatch to a provider-relay endpoint,
//! which owns the actual email/SMS/chat provider integrations.

use std::time::Duration;

use async_trait::async_trait;
use outreach_engine::{Channel, ChannelTransport, SendReceipt, SendRequest, TransportError};
use tracing::info;
use uuid::Uuid;

/// Transport that logs the send and fabricates a local receipt.
pub struct ConsoleTransport {
    channel: Channel,
}

impl ConsoleTransport {
    pub fn new(channel: Channel) -> Self {
        Self { channel }
    }
}

#[async_trait]
impl ChannelTransport for ConsoleTransport {
    fn channel(&self) -> Channel {
        self.channel
    }

    async fn send(&self, request: &SendRequest) -> Result<SendReceipt, TransportError> {
        let message_id = format!("local-{}", Uuid::new_v4());
        info!(
            channel = %self.channel,
            to = %request.to,
            subject = request.subject.as_deref().unwrap_or("-"),
            words = request.body.split_whitespace().count(),
            message_id = %message_id,
            "Console send"
        );
        Ok(SendReceipt { message_id })
    }
}

/// Transport that forwards the dispatch to an HTTP relay.
pub struct HttpRelayTransport {
    channel: Channel,
    relay_url: String,
    client: reqwest::Client,
}

impl HttpRelayTransport {
    pub fn new(channel: Channel, relay_url: &str) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| TransportError::Provider(e.to_string()))?;
        Ok(Self {
            channel,
            relay_url: relay_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl ChannelTransport for HttpRelayTransport {
    fn channel(&self) -> Channel {
        self.channel
    }

    async fn send(&self, request: &SendRequest) -> Result<SendReceipt, TransportError> {
        let body = serde_json::json!({
            "channel": self.channel.to_string(),
            "to": request.to,
            "subject": request.subject,
            "body": request.body,
            "metadata": request.metadata,
        });

        let url = format!("{}/send/{}", self.relay_url, self.channel);
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| TransportError::Provider(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(TransportError::Provider(format!(
                "relay returned {status}: {text}"
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| TransportError::Provider(e.to_string()))?;
        let message_id = json["message_id"]
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| format!("relay-{}", Uuid::new_v4()));
        Ok(SendReceipt { message_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_console_transport_returns_unique_receipts() {
        let transport = ConsoleTransport::new(Channel::Email);
        let request = SendRequest {
            to: "anna@fjordclean.no".to_string(),
            subject: Some("Quick note".to_string()),
            body: "Hello".to_string(),
            metadata: Default::default(),
        };

        let a = transport.send(&request).await.unwrap();
        let b = transport.send(&request).await.unwrap();
        assert_ne!(a.message_id, b.message_id);
        assert!(a.message_id.starts_with("local-"));
    }

    #[tokio::test]
    async fn test_relay_transport_maps_connection_failure() {
        let transport = HttpRelayTransport::new(Channel::Sms, "http://127.0.0.1:1").unwrap();
        let request = SendRequest {
            to: "+4740000000".to_string(),
            subject: None,
            body: "Hello".to_string(),
            metadata: Default::default(),
        };
        let err = transport.send(&request).await.unwrap_err();
        assert!(matches!(err, TransportError::Provider(_)));
    }
}
