//! Error definitions for the MQTT gateway

use std::time::Duration;
use thiserror::Error;

/// Errors raised while setting up or driving the broker connection
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The initial connection attempt failed; the bridge cannot start
    #[error("Failed to connect to MQTT broker: {0}")]
    Connect(#[from] rumqttc::ConnectionError),

    /// No CONNACK arrived within the connect timeout
    #[error("Timed out after {0:?} waiting for the broker to accept the connection")]
    ConnectTimeout(Duration),

    /// The MQTT client rejected a request (request queue closed or full)
    #[error("MQTT client error: {0}")]
    Client(#[from] rumqttc::ClientError),

    /// Operation needs an established link but the gateway has none
    #[error("Gateway is not connected")]
    NotConnected,
}

/// Outcome of a single publish, delivered through a
/// [`PublishReceipt`](super::publisher::PublishReceipt)
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PublishError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("client error: {0}")]
    Client(String),

    #[error("publish queue is full")]
    QueueFull,

    #[error("publisher has shut down")]
    Closed,
}
