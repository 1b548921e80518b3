//! Bounded publish queue with off-path acknowledgment waits.
//!
//! Callers enqueue without awaiting anything. A single worker task drains the
//! queue and starts one bounded wait per message inside a [`JoinSet`], capped
//! at [`MAX_IN_FLIGHT`]. A slow acknowledgment therefore never holds back the
//! next message, and the outcome is logged and forwarded to the message's
//! [`PublishReceipt`] for anyone who cares to look.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, warn};

use super::client::{BusClient, PublishRequest};
use super::error::PublishError;

/// How long a publish may take to be accepted before it is reported as lost.
pub const ACK_TIMEOUT: Duration = Duration::from_secs(1);

const QUEUE_CAPACITY: usize = 256;
const MAX_IN_FLIGHT: usize = 32;

type Outcome = Result<(), PublishError>;

struct Queued {
    request: PublishRequest,
    outcome: oneshot::Sender<Outcome>,
}

/// Handle to the eventual result of one publish. Dropping it is the normal
/// fire-and-forget case.
#[derive(Debug)]
pub struct PublishReceipt {
    rx: oneshot::Receiver<Outcome>,
}

impl PublishReceipt {
    fn resolved(outcome: Outcome) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(outcome);
        Self { rx }
    }

    pub async fn outcome(self) -> Outcome {
        self.rx.await.unwrap_or(Err(PublishError::Closed))
    }
}

#[derive(Clone)]
pub struct PublishQueue {
    tx: mpsc::Sender<Queued>,
}

impl PublishQueue {
    pub fn spawn(client: Arc<dyn BusClient>, ack_timeout: Duration) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        let worker = tokio::spawn(run_publisher(client, rx, ack_timeout));
        debug!(
            "Publish queue started (capacity {}, {} in flight, ack timeout {:?})",
            QUEUE_CAPACITY, MAX_IN_FLIGHT, ack_timeout
        );
        (Self { tx }, worker)
    }

    /// Enqueues a message. Never blocks; a full or closed queue resolves the
    /// receipt immediately.
    pub fn submit(&self, request: PublishRequest) -> PublishReceipt {
        let (outcome, rx) = oneshot::channel();
        match self.tx.try_send(Queued { request, outcome }) {
            Ok(()) => PublishReceipt { rx },
            Err(mpsc::error::TrySendError::Full(queued)) => {
                warn!(
                    "Dropping message for topic {}: publish queue is full",
                    queued.request.topic
                );
                PublishReceipt::resolved(Err(PublishError::QueueFull))
            }
            Err(mpsc::error::TrySendError::Closed(queued)) => {
                warn!(
                    "Dropping message for topic {}: publisher has shut down",
                    queued.request.topic
                );
                PublishReceipt::resolved(Err(PublishError::Closed))
            }
        }
    }
}

async fn run_publisher(
    client: Arc<dyn BusClient>,
    mut rx: mpsc::Receiver<Queued>,
    ack_timeout: Duration,
) {
    let mut in_flight = JoinSet::new();

    loop {
        tokio::select! {
            Some(_) = in_flight.join_next(), if !in_flight.is_empty() => {}
            queued = rx.recv(), if in_flight.len() < MAX_IN_FLIGHT => {
                let Some(queued) = queued else { break };
                in_flight.spawn(deliver(client.clone(), queued, ack_timeout));
            }
        }
    }

    while in_flight.join_next().await.is_some() {}
    debug!("Publish queue drained, publisher stopped");
}

async fn deliver(client: Arc<dyn BusClient>, queued: Queued, ack_timeout: Duration) {
    let Queued { request, outcome } = queued;

    let result = match tokio::time::timeout(ack_timeout, client.publish(&request)).await {
        Ok(Ok(())) => {
            debug!("Published to {}", request.topic);
            Ok(())
        }
        Ok(Err(e)) => {
            warn!("Failed publishing message to topic {}: {}", request.topic, e);
            Err(PublishError::Client(e.to_string()))
        }
        Err(_) => {
            warn!("Timed out publishing message to topic {}", request.topic);
            Err(PublishError::Timeout(ack_timeout))
        }
    };

    let _ = outcome.send(result);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mqtt::client::testing::RecordingClient;

    fn request(topic: &str, payload: &str) -> PublishRequest {
        PublishRequest {
            topic: topic.to_string(),
            retain: false,
            payload: payload.as_bytes().to_vec(),
        }
    }

    #[tokio::test]
    async fn accepted_publish_resolves_ok() {
        let client = Arc::new(RecordingClient::new());
        let (queue, _worker) = PublishQueue::spawn(client.clone(), ACK_TIMEOUT);

        let receipt = queue.submit(request("a/b/status/battery", "87"));

        assert_eq!(receipt.outcome().await, Ok(()));
        assert_eq!(client.payloads_for("a/b/status/battery"), vec!["87"]);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_acknowledgment_times_out_without_blocking_the_caller() {
        let client = Arc::new(RecordingClient::with_delay(Some(Duration::from_secs(3))));
        let (queue, _worker) = PublishQueue::spawn(client.clone(), ACK_TIMEOUT);

        let started = tokio::time::Instant::now();
        let first = queue.submit(request("a/b/status/music/state", "playing"));
        let second = queue.submit(request("a/b/status/music/volume", "40"));
        assert_eq!(started.elapsed(), Duration::ZERO);

        // The second message is handed over while the first still waits.
        client.wait_issued(2).await;
        assert!(started.elapsed() < ACK_TIMEOUT);

        assert_eq!(first.outcome().await, Err(PublishError::Timeout(ACK_TIMEOUT)));
        assert_eq!(second.outcome().await, Err(PublishError::Timeout(ACK_TIMEOUT)));
        assert!(client.published().is_empty());
    }

    #[tokio::test]
    async fn dropped_receipt_still_publishes() {
        let client = Arc::new(RecordingClient::new());
        let (queue, _worker) = PublishQueue::spawn(client.clone(), ACK_TIMEOUT);

        drop(queue.submit(request("a/b/status/alive", "true")));

        client.wait_published(1).await;
        assert_eq!(client.payloads_for("a/b/status/alive"), vec!["true"]);
    }

    #[tokio::test]
    async fn submit_after_worker_stops_reports_closed() {
        let client = Arc::new(RecordingClient::new());
        let (queue, worker) = PublishQueue::spawn(client, ACK_TIMEOUT);
        worker.abort();
        let _ = worker.await;

        let receipt = queue.submit(request("a/b/status/alive", "true"));
        assert_eq!(receipt.outcome().await, Err(PublishError::Closed));
    }
}
