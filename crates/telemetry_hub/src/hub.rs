use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, warn};

/// Per-client outbound buffer capacity (§4.5 "bounded send buffer of 64 messages").
pub const CLIENT_BUFFER_CAPACITY: usize = 64;

pub const WILDCARD_TOPIC: &str = "*";

/// Envelope every broadcast message is wrapped in before reaching a client
/// (§6 "Frames are JSON `{topic, timestamp, data}`").
#[derive(Debug, Clone, Serialize)]
pub struct Frame {
    pub topic: String,
    pub timestamp: chrono::DateTime<Utc>,
    pub data: serde_json::Value,
}

pub type ClientId = u64;

struct Client {
    topics: Vec<String>,
    sender: mpsc::Sender<Frame>,
}

impl Client {
    fn subscribes(&self, topic: &str) -> bool {
        self.topics.iter().any(|t| t == WILDCARD_TOPIC || t == topic)
    }
}

/// Process-wide fan-out hub (§4.5 "Topology"). Owns the live client set; a
/// WebSocket upgrade registers a client and gets back its outbound receiver,
/// producers broadcast by topic, and the dispatcher never blocks on a slow
/// consumer: a full buffer just drops that client's copy of the message.
#[derive(Clone)]
pub struct Hub {
    clients: Arc<RwLock<HashMap<ClientId, Client>>>,
    next_id: Arc<AtomicU64>,
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

impl Hub {
    pub fn new() -> Self {
        Self {
            clients: Arc::new(RwLock::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Registers a new client subscribed to `topics`, returning its id and
    /// the receiving half it should drain in its write task.
    pub async fn register(&self, topics: Vec<String>) -> (ClientId, mpsc::Receiver<Frame>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(CLIENT_BUFFER_CAPACITY);
        self.clients.write().await.insert(id, Client { topics, sender: tx });
        debug!(client = id, "registered telemetry client");
        (id, rx)
    }

    /// Drops a client. Dropping its sender closes the channel, which ends
    /// the client's write task (§4.5 "closes the send buffer").
    pub async fn deregister(&self, id: ClientId) {
        self.clients.write().await.remove(&id);
        debug!(client = id, "deregistered telemetry client");
    }

    /// Broadcasts `data` under `topic` to every subscribed client. Uses
    /// `try_send` so a full client buffer drops that one copy instead of
    /// blocking the dispatcher (§4.5 backpressure policy).
    pub async fn broadcast(&self, topic: &str, data: serde_json::Value) {
        let frame = Frame {
            topic: topic.to_string(),
            timestamp: Utc::now(),
            data,
        };

        let clients = self.clients.read().await;
        for (id, client) in clients.iter() {
            if !client.subscribes(topic) {
                continue;
            }
            if client.sender.try_send(frame.clone()).is_err() {
                warn!(client = id, topic, "telemetry client buffer full; dropping frame");
            }
        }
    }

    pub async fn client_count(&self) -> usize {
        self.clients.read().await.len()
    }
}

/// Parses the topic a client subscribes to from the WebSocket path/query
/// (§4.5 "Client lifecycle"): a named path segment wins over `?topic=`.
pub fn topic_from_request(path_topic: Option<&str>, query_topic: Option<&str>) -> String {
    path_topic
        .or(query_topic)
        .filter(|t| !t.is_empty())
        .unwrap_or(WILDCARD_TOPIC)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_matching_topic() {
        let hub = Hub::new();
        let (_id, mut rx) = hub.register(vec!["gpu-metrics".to_string()]).await;

        hub.broadcast("gpu-metrics", serde_json::json!({"gpus": 4})).await;

        let frame = rx.recv().await.expect("frame delivered");
        assert_eq!(frame.topic, "gpu-metrics");
    }

    #[tokio::test]
    async fn subscriber_does_not_receive_other_topics() {
        let hub = Hub::new();
        let (_id, mut rx) = hub.register(vec!["gpu-metrics".to_string()]).await;

        hub.broadcast("epp-decisions", serde_json::json!({})).await;

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn wildcard_subscriber_receives_every_topic() {
        let hub = Hub::new();
        let (_id, mut rx) = hub.register(vec![WILDCARD_TOPIC.to_string()]).await;

        hub.broadcast("scaling-events", serde_json::json!({})).await;
        hub.broadcast("gpu-metrics", serde_json::json!({})).await;

        assert!(rx.recv().await.is_some());
        assert!(rx.recv().await.is_some());
    }

    #[tokio::test]
    async fn full_buffer_drops_without_blocking() {
        let hub = Hub::new();
        let (_id, mut rx) = hub.register(vec!["gpu-metrics".to_string()]).await;

        for i in 0..(CLIENT_BUFFER_CAPACITY + 10) {
            hub.broadcast("gpu-metrics", serde_json::json!({"i": i})).await;
        }

        let mut received = 0;
        while rx.try_recv().is_ok() {
            received += 1;
        }
        assert!(received <= CLIENT_BUFFER_CAPACITY);
    }

    #[tokio::test]
    async fn deregister_closes_channel() {
        let hub = Hub::new();
        let (id, mut rx) = hub.register(vec![WILDCARD_TOPIC.to_string()]).await;
        hub.deregister(id).await;

        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn topic_path_wins_over_query() {
        assert_eq!(topic_from_request(Some("gpu-metrics"), Some("scaling-events")), "gpu-metrics");
    }

    #[test]
    fn empty_falls_back_to_wildcard() {
        assert_eq!(topic_from_request(None, None), WILDCARD_TOPIC);
    }
}
