//! MQTT gateway: the single owner of the broker connection.
//!
//! The gateway is a statum state machine with two states:
//!
//! ```text
//! Configured ──connect()──► Online ──run()──► (drives the event loop until shutdown)
//! ```
//!
//! While `Configured`, command handlers are registered by topic suffix. The
//! registry is frozen when `connect()` runs. `connect()` waits for the first
//! CONNACK and fails hard if the broker cannot be reached. Afterwards the
//! event loop reconnects on its own; every CONNACK republishes
//! `status/alive = "true"` and re-subscribes to the command filter.
//!
//! Components never touch the client directly. They get a cloneable
//! [`GatewayHandle`] that can only enqueue publishes and observe status.

use chrono::{DateTime, Local};
use rumqttc::{
    AsyncClient, ConnectReturnCode, Event, EventLoop, LastWill, MqttOptions, Outgoing, Packet,
    SubscribeReasonCode, Transport,
};
use statum::{machine, state};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::client::{BusClient, PublishRequest, BRIDGE_QOS};
use super::error::GatewayError;
use super::publisher::{PublishQueue, PublishReceipt, ACK_TIMEOUT};
use super::topic::{Namespace, Suffix};

const CLIENT_CAPACITY: usize = 64;
const SHUTDOWN_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Connection parameters, resolved from the config file
#[derive(Clone, Debug)]
pub struct GatewaySettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub tls: bool,
    pub keep_alive: Duration,
    pub connect_timeout: Duration,
    pub reconnect_delay: Duration,
}

#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Clone, Debug, Default)]
pub struct GatewayStatus {
    pub connection_state: ConnectionState,
    /// Successful CONNACKs seen, the initial one included
    pub connects: usize,
    pub messages_received: usize,
    pub last_activity: Option<DateTime<Local>>,
}

pub type CommandHandler = Arc<dyn Fn(&[u8]) + Send + Sync>;

/// Command handlers keyed by topic suffix
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<Suffix, CommandHandler>,
}

impl HandlerRegistry {
    pub fn insert(&mut self, suffix: Suffix, handler: CommandHandler) {
        if self.handlers.insert(suffix, handler).is_some() {
            warn!("Replacing command handler for {}", suffix);
        }
    }

    /// Runs the handler for `suffix`, returns false if there is none.
    pub fn dispatch(&self, suffix: Suffix, payload: &[u8]) -> bool {
        match self.handlers.get(&suffix) {
            Some(handler) => {
                handler(payload);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// Cheap, cloneable access to the gateway for publishing components
#[derive(Clone)]
pub struct GatewayHandle {
    namespace: Namespace,
    queue: PublishQueue,
    status: watch::Receiver<GatewayStatus>,
}

impl GatewayHandle {
    pub(crate) fn new(
        namespace: Namespace,
        queue: PublishQueue,
        status: watch::Receiver<GatewayStatus>,
    ) -> Self {
        Self {
            namespace,
            queue,
            status,
        }
    }

    /// Publishes under this host's namespace without blocking the caller.
    ///
    /// The message is queued and a bounded acknowledgment wait happens on the
    /// publisher task. Failures and timeouts are logged there; the returned
    /// receipt can be awaited to observe them, or dropped.
    pub fn publish_and_wait(
        &self,
        suffix: Suffix,
        retained: bool,
        payload: impl Into<Vec<u8>>,
    ) -> PublishReceipt {
        self.queue.submit(PublishRequest {
            topic: self.namespace.full_topic(suffix),
            retain: retained,
            payload: payload.into(),
        })
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn status(&self) -> watch::Receiver<GatewayStatus> {
        self.status.clone()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.status.borrow().connection_state
    }
}

/// Reacts to event loop output. Runs on the event loop task, so everything
/// here must return quickly.
pub struct EventDispatcher {
    handle: GatewayHandle,
    client: Arc<dyn BusClient>,
    registry: Arc<HandlerRegistry>,
    status: watch::Sender<GatewayStatus>,
}

impl EventDispatcher {
    pub(crate) fn new(
        handle: GatewayHandle,
        client: Arc<dyn BusClient>,
        registry: Arc<HandlerRegistry>,
        status: watch::Sender<GatewayStatus>,
    ) -> Self {
        Self {
            handle,
            client,
            registry,
            status,
        }
    }

    pub(crate) fn handle_event(&self, event: &Event) {
        match event {
            Event::Incoming(Packet::ConnAck(ack)) if ack.code == ConnectReturnCode::Success => {
                self.on_connected()
            }
            Event::Incoming(Packet::ConnAck(ack)) => {
                error!("Broker refused connection: {:?}", ack.code)
            }
            Event::Incoming(Packet::Publish(publish)) => {
                self.on_message(&publish.topic, &publish.payload)
            }
            Event::Incoming(Packet::SubAck(ack)) => {
                if ack
                    .return_codes
                    .iter()
                    .any(|code| matches!(code, SubscribeReasonCode::Failure))
                {
                    warn!("Broker rejected command subscription: {:?}", ack.return_codes);
                } else {
                    debug!("Command subscription confirmed");
                }
            }
            other => debug!("MQTT event: {:?}", other),
        }
    }

    fn on_connected(&self) {
        self.status.send_modify(|status| {
            status.connection_state = ConnectionState::Connected;
            status.connects += 1;
            status.last_activity = Some(Local::now());
        });
        info!("Connected to MQTT");

        let namespace = self.handle.namespace();
        info!(
            "Sending 'true' to topic: {}",
            namespace.full_topic(Suffix::Alive)
        );
        drop(self.handle.publish_and_wait(Suffix::Alive, true, "true"));

        // The client queue may still hold publishes from the outage, and with
        // a clean session the broker forgot the old subscription.
        let filter = namespace.command_filter();
        let client = self.client.clone();
        tokio::spawn(async move {
            match client.subscribe(&filter).await {
                Ok(()) => info!("Subscribing to {}", filter),
                Err(e) => warn!("Failed subscribing to topic {}: {}", filter, e),
            }
        });
    }

    pub(crate) fn on_connection_lost(&self, reason: &dyn fmt::Display) {
        let was_connected = self.status.borrow().connection_state == ConnectionState::Connected;
        self.status.send_modify(|status| {
            status.connection_state = ConnectionState::Disconnected;
        });
        if was_connected {
            warn!("Disconnected from MQTT: {}", reason);
        } else {
            debug!("Reconnect attempt failed: {}", reason);
        }
    }

    pub(crate) fn on_reconnecting(&self) {
        self.status.send_modify(|status| {
            status.connection_state = ConnectionState::Connecting;
        });
    }

    fn on_message(&self, topic: &str, payload: &[u8]) {
        self.status.send_modify(|status| {
            status.messages_received += 1;
            status.last_activity = Some(Local::now());
        });
        debug!(
            "Received message: {} from topic: {}",
            String::from_utf8_lossy(payload),
            topic
        );

        match self.handle.namespace().suffix_of(topic) {
            Some(suffix) if suffix.is_command() => {
                if !self.registry.dispatch(suffix, payload) {
                    debug!("No handler for {}, ignoring", suffix);
                }
            }
            _ => debug!("Ignoring message on unknown topic {}", topic),
        }
    }

    fn handle(&self) -> &GatewayHandle {
        &self.handle
    }
}

/// Connection-scoped pieces that exist once the gateway is online
pub struct Link {
    client: Arc<dyn BusClient>,
    eventloop: EventLoop,
    dispatcher: EventDispatcher,
}

#[state]
#[derive(Debug, Clone)]
pub enum GatewayState {
    Configured,
    Online,
}

#[machine]
pub struct Gateway<S: GatewayState> {
    namespace: Namespace,
    settings: GatewaySettings,
    options: MqttOptions,
    registry: HandlerRegistry,
    link: Option<Link>,
}

impl<S: GatewayState> Gateway<S> {
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn options(&self) -> &MqttOptions {
        &self.options
    }
}

impl Gateway<Configured> {
    /// Prepares the connection options, including the retained last-will
    /// `status/alive = "false"` the broker sends if we vanish.
    pub fn create(settings: GatewaySettings, namespace: Namespace) -> Self {
        let client_id = format!(
            "{}-{}",
            namespace.as_str().replace('/', "-"),
            std::process::id()
        );
        debug!(
            "Creating MQTT gateway {} for {}:{} (tls: {})",
            client_id, settings.host, settings.port, settings.tls
        );

        let mut options = MqttOptions::new(client_id, settings.host.clone(), settings.port);
        options
            .set_credentials(settings.user.clone(), settings.password.clone())
            .set_keep_alive(settings.keep_alive)
            .set_clean_session(true)
            .set_last_will(LastWill::new(
                namespace.full_topic(Suffix::Alive),
                "false",
                BRIDGE_QOS,
                true,
            ));
        if settings.tls {
            options.set_transport(Transport::tls_with_default_config());
        }

        Self::new(
            namespace,
            settings,
            options,
            HandlerRegistry::default(),
            None, // link
        )
    }

    pub fn register(&mut self, suffix: Suffix, handler: CommandHandler) {
        debug!("Registering command handler for {}", suffix);
        self.registry.insert(suffix, handler);
    }

    /// Opens the connection and waits for the broker to accept it.
    ///
    /// # Errors
    ///
    /// Any failure before the first CONNACK is returned: the bridge treats an
    /// unreachable broker at startup as fatal.
    pub async fn connect(mut self) -> Result<Gateway<Online>, GatewayError> {
        info!(
            "Connecting to MQTT broker at {}:{}",
            self.settings.host, self.settings.port
        );

        let (client, mut eventloop) = AsyncClient::new(self.options.clone(), CLIENT_CAPACITY);
        let client: Arc<dyn BusClient> = Arc::new(client);

        let (queue, _publisher) = PublishQueue::spawn(client.clone(), ACK_TIMEOUT);
        let (status_tx, status_rx) = watch::channel(GatewayStatus {
            connection_state: ConnectionState::Connecting,
            ..GatewayStatus::default()
        });
        let handle = GatewayHandle::new(self.namespace.clone(), queue, status_rx);
        let registry = Arc::new(std::mem::take(&mut self.registry));
        debug!("Frozen command registry with {} handlers", registry.len());
        let dispatcher = EventDispatcher::new(handle, client.clone(), registry, status_tx);

        let timeout = self.settings.connect_timeout;
        match tokio::time::timeout(timeout, wait_for_connack(&mut eventloop, &dispatcher)).await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!("Initial MQTT connection failed: {}", e);
                return Err(e);
            }
            Err(_) => {
                error!("Initial MQTT connection timed out after {:?}", timeout);
                return Err(GatewayError::ConnectTimeout(timeout));
            }
        }

        self.link = Some(Link {
            client,
            eventloop,
            dispatcher,
        });
        Ok(self.transition())
    }
}

async fn wait_for_connack(
    eventloop: &mut EventLoop,
    dispatcher: &EventDispatcher,
) -> Result<(), GatewayError> {
    loop {
        let event = eventloop.poll().await?;
        let connected = matches!(
            event,
            Event::Incoming(Packet::ConnAck(ref ack)) if ack.code == ConnectReturnCode::Success
        );
        dispatcher.handle_event(&event);
        if connected {
            return Ok(());
        }
    }
}

impl Gateway<Online> {
    pub fn handle(&self) -> Result<GatewayHandle, GatewayError> {
        match &self.link {
            Some(link) => Ok(link.dispatcher.handle().clone()),
            None => Err(GatewayError::NotConnected),
        }
    }

    /// Drives the event loop until `shutdown` fires.
    ///
    /// Connection errors are logged and followed by a fixed delay; the next
    /// poll lets the client reconnect. On shutdown the gateway publishes
    /// `status/alive = "false"` itself, since a clean disconnect suppresses
    /// the last-will.
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<(), GatewayError> {
        let Link {
            client,
            mut eventloop,
            dispatcher,
        } = self.link.take().ok_or(GatewayError::NotConnected)?;
        let reconnect_delay = self.settings.reconnect_delay;

        info!("MQTT event loop running");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                polled = eventloop.poll() => match polled {
                    Ok(event) => dispatcher.handle_event(&event),
                    Err(e) => {
                        if !back_off(&dispatcher, &e, reconnect_delay, &shutdown).await {
                            break;
                        }
                    }
                },
            }
        }

        info!("Shutting down MQTT gateway");
        go_offline(client.as_ref(), &mut eventloop, dispatcher.handle().namespace()).await;
        Ok(())
    }
}

/// Marks the link lost and waits out the reconnect delay. Returns false if
/// shutdown fired while waiting.
async fn back_off(
    dispatcher: &EventDispatcher,
    reason: &(dyn fmt::Display + Sync),
    delay: Duration,
    shutdown: &CancellationToken,
) -> bool {
    dispatcher.on_connection_lost(reason);
    tokio::select! {
        _ = shutdown.cancelled() => return false,
        _ = tokio::time::sleep(delay) => {}
    }
    dispatcher.on_reconnecting();
    true
}

async fn go_offline(client: &dyn BusClient, eventloop: &mut EventLoop, namespace: &Namespace) {
    if !announce_offline(client, namespace).await {
        return;
    }

    let drained = tokio::time::timeout(SHUTDOWN_DRAIN_TIMEOUT, async {
        loop {
            match eventloop.poll().await {
                Ok(Event::Outgoing(Outgoing::Disconnect)) => break,
                Ok(_) => {}
                Err(e) => {
                    debug!("Event loop closed during shutdown: {}", e);
                    break;
                }
            }
        }
    })
    .await;
    if drained.is_err() {
        warn!("Broker did not take the disconnect in time");
    }
    info!("Disconnected from MQTT");
}

/// Publishes the retained `alive = "false"`, then asks the client to
/// disconnect. Returns whether the disconnect request went through.
async fn announce_offline(client: &dyn BusClient, namespace: &Namespace) -> bool {
    let offline = PublishRequest {
        topic: namespace.full_topic(Suffix::Alive),
        retain: true,
        payload: b"false".to_vec(),
    };
    match tokio::time::timeout(ACK_TIMEOUT, client.publish(&offline)).await {
        Ok(Ok(())) => debug!("Queued offline status"),
        Ok(Err(e)) => warn!("Failed publishing offline status: {}", e),
        Err(_) => warn!("Timed out publishing offline status"),
    }
    match client.disconnect().await {
        Ok(()) => true,
        Err(e) => {
            warn!("Failed to request disconnect: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mqtt::client::testing::RecordingClient;
    use rumqttc::{ConnAck, Publish, Request, SubAck};
    use std::sync::Mutex;

    fn settings() -> GatewaySettings {
        GatewaySettings {
            host: "broker.lan".to_string(),
            port: 1883,
            user: "bridge".to_string(),
            password: "secret".to_string(),
            tls: false,
            keep_alive: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(10),
            reconnect_delay: Duration::from_secs(2),
        }
    }

    fn namespace() -> Namespace {
        Namespace::new("mac2mqtt", "desk").unwrap()
    }

    struct Fixture {
        client: Arc<RecordingClient>,
        dispatcher: EventDispatcher,
        status: watch::Receiver<GatewayStatus>,
    }

    fn fixture(registry: HandlerRegistry) -> Fixture {
        let client = Arc::new(RecordingClient::new());
        let (queue, _worker) = PublishQueue::spawn(client.clone(), ACK_TIMEOUT);
        let (status_tx, status_rx) = watch::channel(GatewayStatus::default());
        let handle = GatewayHandle::new(namespace(), queue, status_rx.clone());
        let dispatcher =
            EventDispatcher::new(handle, client.clone(), Arc::new(registry), status_tx);
        Fixture {
            client,
            dispatcher,
            status: status_rx,
        }
    }

    fn connack() -> Event {
        Event::Incoming(Packet::ConnAck(ConnAck::new(
            ConnectReturnCode::Success,
            false,
        )))
    }

    fn inbound(topic: &str, payload: &str) -> Event {
        Event::Incoming(Packet::Publish(Publish::new(topic, BRIDGE_QOS, payload)))
    }

    #[test]
    fn options_carry_retained_last_will_and_credentials() {
        let gateway = Gateway::create(settings(), namespace());
        let options = gateway.options();

        let will = options.last_will().expect("last will is set");
        assert_eq!(will.topic, "mac2mqtt/desk/status/alive");
        assert_eq!(&will.message[..], b"false");
        assert!(will.retain);
        assert_eq!(will.qos, BRIDGE_QOS);

        assert_eq!(options.broker_address(), ("broker.lan".to_string(), 1883));
        assert_eq!(
            options.credentials(),
            Some(("bridge".to_string(), "secret".to_string()))
        );
        assert!(options.clean_session());
        assert!(options.client_id().starts_with("mac2mqtt-desk-"));
    }

    #[tokio::test]
    async fn connack_publishes_alive_and_subscribes() {
        let fx = fixture(HandlerRegistry::default());

        fx.dispatcher.handle_event(&connack());
        fx.client.wait_published(1).await;
        fx.client.wait_subscribed(1).await;

        let published = fx.client.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].topic, "mac2mqtt/desk/status/alive");
        assert_eq!(published[0].payload, b"true");
        assert!(published[0].retain);
        assert_eq!(fx.client.subscriptions(), vec!["mac2mqtt/desk/command/#"]);
        assert_eq!(fx.status.borrow().connection_state, ConnectionState::Connected);

        let handle = fx.dispatcher.handle();
        assert_eq!(handle.connection_state(), ConnectionState::Connected);
        assert_eq!(handle.status().borrow().connects, 1);
        assert!(handle.status().borrow().last_activity.is_some());
    }

    #[tokio::test]
    async fn each_reconnect_republishes_alive_and_resubscribes_once() {
        let fx = fixture(HandlerRegistry::default());

        fx.dispatcher.handle_event(&connack());
        for _ in 0..2 {
            fx.dispatcher.on_connection_lost(&"connection reset by peer");
            assert_eq!(
                fx.status.borrow().connection_state,
                ConnectionState::Disconnected
            );
            fx.dispatcher.on_reconnecting();
            assert_eq!(
                fx.status.borrow().connection_state,
                ConnectionState::Connecting
            );
            fx.dispatcher.handle_event(&connack());
        }
        fx.client.wait_published(3).await;
        fx.client.wait_subscribed(3).await;

        assert_eq!(
            fx.client.payloads_for("mac2mqtt/desk/status/alive"),
            vec!["true", "true", "true"]
        );
        assert_eq!(fx.client.subscriptions().len(), 3);
        assert_eq!(fx.status.borrow().connects, 3);
    }

    #[tokio::test]
    async fn reconnect_subscribes_even_when_client_queue_is_full() {
        let options = Gateway::create(settings(), namespace()).options().clone();
        let (client, mut eventloop) = AsyncClient::new(options, CLIENT_CAPACITY);
        // Backlog left over from an outage
        for _ in 0..CLIENT_CAPACITY {
            client
                .try_publish("mac2mqtt/desk/status/battery", BRIDGE_QOS, false, "50")
                .unwrap();
        }
        let client: Arc<dyn BusClient> = Arc::new(client);
        let (queue, _worker) = PublishQueue::spawn(client.clone(), ACK_TIMEOUT);
        let (status_tx, status_rx) = watch::channel(GatewayStatus::default());
        let handle = GatewayHandle::new(namespace(), queue, status_rx);
        let dispatcher =
            EventDispatcher::new(handle, client, Arc::new(HandlerRegistry::default()), status_tx);

        dispatcher.handle_event(&connack());

        let subscribed = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                eventloop.clean();
                let queued = eventloop
                    .pending
                    .clone()
                    .into_iter()
                    .any(|request| matches!(request, Request::Subscribe(_)));
                if queued {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        assert!(subscribed.is_ok(), "command subscription never reached the client");
    }

    #[tokio::test(start_paused = true)]
    async fn back_off_marks_lost_then_reconnecting() {
        let fx = fixture(HandlerRegistry::default());
        fx.dispatcher.handle_event(&connack());
        let shutdown = CancellationToken::new();

        let waiting = back_off(
            &fx.dispatcher,
            &"connection reset by peer",
            Duration::from_secs(2),
            &shutdown,
        );
        tokio::pin!(waiting);
        assert!(tokio::time::timeout(Duration::from_secs(1), &mut waiting)
            .await
            .is_err());
        assert_eq!(
            fx.status.borrow().connection_state,
            ConnectionState::Disconnected
        );

        assert!(waiting.await);
        assert_eq!(fx.status.borrow().connection_state, ConnectionState::Connecting);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_during_back_off_stops_reconnecting() {
        let fx = fixture(HandlerRegistry::default());
        fx.dispatcher.handle_event(&connack());
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        let resumed = back_off(
            &fx.dispatcher,
            &"connection reset by peer",
            Duration::from_secs(2),
            &shutdown,
        )
        .await;

        assert!(!resumed);
        assert_eq!(
            fx.status.borrow().connection_state,
            ConnectionState::Disconnected
        );
    }

    #[tokio::test]
    async fn offline_status_is_retained_and_sent_before_disconnect() {
        let client = RecordingClient::new();

        assert!(announce_offline(&client, &namespace()).await);

        let published = client.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].topic, "mac2mqtt/desk/status/alive");
        assert_eq!(published[0].payload, b"false");
        assert!(published[0].retain);
        assert_eq!(client.disconnects(), vec![1]);
    }

    #[tokio::test]
    async fn inbound_command_reaches_registered_handler() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let mut registry = HandlerRegistry::default();
        registry.insert(
            Suffix::CommandMusicVolume,
            Arc::new(move |payload: &[u8]| sink.lock().unwrap().push(payload.to_vec())),
        );
        let fx = fixture(registry);

        fx.dispatcher
            .handle_event(&inbound("mac2mqtt/desk/command/music/volume", "55"));
        fx.dispatcher
            .handle_event(&inbound("mac2mqtt/desk/command/music/playpause", "true"));
        fx.dispatcher
            .handle_event(&inbound("mac2mqtt/desk/command/lights/on", "1"));
        fx.dispatcher
            .handle_event(&inbound("mac2mqtt/other/command/music/volume", "10"));
        fx.dispatcher
            .handle_event(&inbound("mac2mqtt/desk/status/music/volume", "10"));

        assert_eq!(*seen.lock().unwrap(), vec![b"55".to_vec()]);
        assert_eq!(fx.status.borrow().messages_received, 5);
    }

    #[tokio::test]
    async fn failed_suback_is_not_fatal() {
        let fx = fixture(HandlerRegistry::default());
        fx.dispatcher.handle_event(&Event::Incoming(Packet::SubAck(SubAck::new(
            1,
            vec![SubscribeReasonCode::Failure],
        ))));
        assert_eq!(fx.status.borrow().connection_state, ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn unreachable_broker_fails_connect() {
        let mut unreachable = settings();
        unreachable.host = "127.0.0.1".to_string();
        unreachable.port = 1;
        unreachable.connect_timeout = Duration::from_secs(5);

        let result = Gateway::create(unreachable, namespace()).connect().await;
        assert!(matches!(
            result,
            Err(GatewayError::Connect(_)) | Err(GatewayError::ConnectTimeout(_))
        ));
    }
}
