//! # MQTT Gateway Module
//!
//! Owns the broker connection and everything that talks to it directly.
//!
//! ## Module Architecture
//!
//! ```text
//! mqtt/
//! ├── topic.rs      - Host namespace and the closed set of topic suffixes
//! ├── client.rs     - BusClient seam over rumqttc::AsyncClient
//! ├── publisher.rs  - Bounded publish queue and acknowledgment timeouts
//! ├── gateway.rs    - Connection state machine, last-will, reconnect, dispatch
//! └── error.rs      - GatewayError and PublishError
//! ```
//!
//! ## Delivery contract
//!
//! Everything is published at QoS 0. `publish_and_wait` returns at once; the
//! wait for the client to accept the message is bounded at one second and
//! happens on the publisher task. Lost or late messages are logged, never
//! retried. Status topics are refreshed periodically, so the next tick
//! repairs a dropped message.

pub mod client;
pub mod error;
pub mod gateway;
pub mod publisher;
pub mod topic;

pub use error::{GatewayError, PublishError};
pub use gateway::{
    CommandHandler, ConnectionState, Gateway, GatewayHandle, GatewaySettings, GatewayStatus,
};
pub use publisher::PublishReceipt;
pub use topic::{Namespace, Suffix};
