//! Narrow seam between the gateway and the MQTT client library.
//!
//! The gateway only ever needs to hand a publish to the client, request a
//! subscription and disconnect. Keeping that behind [`BusClient`] lets the
//! publisher and dispatcher run against a recording client in tests.

use async_trait::async_trait;
use rumqttc::{AsyncClient, QoS};

use super::error::GatewayError;

/// QoS used for every message: fire and forget, no broker-side persistence.
pub const BRIDGE_QOS: QoS = QoS::AtMostOnce;

/// A single outbound message. Created per publish call and dropped once the
/// client has taken it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRequest {
    pub topic: String,
    pub retain: bool,
    pub payload: Vec<u8>,
}

#[async_trait]
pub trait BusClient: Send + Sync {
    /// Hands a message to the client. Resolves once the client accepted it.
    async fn publish(&self, request: &PublishRequest) -> Result<(), GatewayError>;

    /// Requests a subscription. Resolves once the client queued it, which can
    /// take until the event loop drains a backlog; never await this on the
    /// event loop task.
    async fn subscribe(&self, filter: &str) -> Result<(), GatewayError>;

    async fn disconnect(&self) -> Result<(), GatewayError>;
}

#[async_trait]
impl BusClient for AsyncClient {
    async fn publish(&self, request: &PublishRequest) -> Result<(), GatewayError> {
        AsyncClient::publish(
            self,
            request.topic.as_str(),
            BRIDGE_QOS,
            request.retain,
            request.payload.clone(),
        )
        .await?;
        Ok(())
    }

    async fn subscribe(&self, filter: &str) -> Result<(), GatewayError> {
        AsyncClient::subscribe(self, filter, BRIDGE_QOS).await?;
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), GatewayError> {
        AsyncClient::disconnect(self).await?;
        Ok(())
    }
}
