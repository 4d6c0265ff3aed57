//! Broker publishing.

use async_trait::async_trait;

use crate::AdapterError;

/// Destination of published payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub exchange: String,
    pub queue: String,
    pub routing_key: String,
}

impl Default for Route {
    fn default() -> Self {
        Self {
            exchange: "amq.topic".to_string(),
            queue: "Gateway".to_string(),
            routing_key: "sensor".to_string(),
        }
    }
}

/// A message broker with a fixed route.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Whether the broker currently accepts connections.
    async fn is_reachable(&self) -> bool;

    /// Publish one body on the configured route.
    ///
    /// `Ok(())` means the broker accepted the message.
    async fn publish(&self, body: &[u8]) -> Result<(), AdapterError>;
}
