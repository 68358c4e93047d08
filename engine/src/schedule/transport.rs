//! Channel transport contract and the static per-channel registry.
//!
//! Concrete provider integrations live outside the engine; the scheduler
//! depends only on this contract. Transports are selected via a static
//! mapping, one implementation per channel.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::compose::Channel;

/// Error type for transport dispatch.
///
/// Distinct from a policy-gate skip: transport failures carry bounded-retry
/// semantics, skips do not.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("provider error: {0}")]
    Provider(String),

    #[error("no transport registered for channel {0}")]
    NotRegistered(Channel),

    #[error("recipient address missing for channel {0}")]
    MissingRecipient(Channel),
}

/// One outbound dispatch request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendRequest {
    /// Channel-appropriate recipient handle
    pub to: String,
    /// Subject line (email only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub body: String,
    /// Opaque correlation metadata passed through to the provider
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

/// Provider receipt for a successful dispatch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendReceipt {
    /// Provider message identifier; delivery webhooks are keyed by this
    pub message_id: String,
}

/// Contract of one channel's transport
#[async_trait]
pub trait ChannelTransport: Send + Sync {
    /// The channel this transport serves.
    fn channel(&self) -> Channel;

    /// Dispatch one message.
    async fn send(&self, request: &SendRequest) -> Result<SendReceipt, TransportError>;
}

/// Static mapping from channel to transport implementation.
#[derive(Default, Clone)]
pub struct TransportRegistry {
    transports: HashMap<Channel, Arc<dyn ChannelTransport>>,
}

impl TransportRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a transport under its own channel. Last registration wins.
    pub fn register(mut self, transport: Arc<dyn ChannelTransport>) -> Self {
        self.transports.insert(transport.channel(), transport);
        self
    }

    /// Look up the transport for a channel.
    pub fn get(&self, channel: Channel) -> Result<Arc<dyn ChannelTransport>, TransportError> {
        self.transports
            .get(&channel)
            .cloned()
            .ok_or(TransportError::NotRegistered(channel))
    }

    /// Channels with a registered transport.
    pub fn channels(&self) -> Vec<Channel> {
        self.transports.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullTransport(Channel);

    #[async_trait]
    impl ChannelTransport for NullTransport {
        fn channel(&self) -> Channel {
            self.0
        }
        async fn send(&self, _request: &SendRequest) -> Result<SendReceipt, TransportError> {
            Ok(SendReceipt {
                message_id: "msg-1".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_registry_routes_by_channel() {
        let registry = TransportRegistry::new()
            .register(Arc::new(NullTransport(Channel::Email)))
            .register(Arc::new(NullTransport(Channel::Sms)));

        assert!(registry.get(Channel::Email).is_ok());
        assert!(registry.get(Channel::Sms).is_ok());
        assert!(matches!(
            registry.get(Channel::Linkedin),
            Err(TransportError::NotRegistered(Channel::Linkedin))
        ));
    }
}
