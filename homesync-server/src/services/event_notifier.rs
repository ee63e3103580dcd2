use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use homesync_api::restful::EventMessage;
use serde_json::Value;
use time::OffsetDateTime;
use tokio::sync::{RwLock, broadcast};

const CHANNEL_CAPACITY: usize = 100;

pub const DEVICE_STATUS_UPDATED: &str = "DeviceStatusUpdated";
pub const DEVICE_STATUS_CHANGED: &str = "DeviceStatusChanged";
pub const DEVICES_SYNCED: &str = "DevicesSynced";
pub const NOTIFICATION_CREATED: &str = "NotificationCreated";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    Device(String),
    User(i32),
    Broadcast,
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::Device(external_id) => write!(f, "device:{external_id}"),
            Topic::User(user_id) => write!(f, "user:{user_id}"),
            Topic::Broadcast => f.write_str("broadcast"),
        }
    }
}

/// Best-effort fan-out to connected subscribers, one broadcast channel per topic.
#[derive(Clone, Default)]
pub struct EventNotifier {
    publishers: Arc<RwLock<HashMap<String, broadcast::Sender<EventMessage>>>>,
}

impl EventNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns how many subscribers received the event. Never fails: a topic nobody listens to is skipped.
    pub async fn publish(&self, topic: &Topic, event: &str, payload: Value) -> usize {
        let topic = topic.to_string();
        let sender = {
            let publishers = self.publishers.read().await;
            publishers.get(&topic).cloned()
        };

        let Some(sender) = sender else {
            tracing::debug!(%topic, event, "no subscribers, event dropped");
            return 0;
        };

        let message = EventMessage {
            topic: topic.clone(),
            event: event.to_string(),
            payload,
            timestamp: OffsetDateTime::now_utc(),
        };

        match sender.send(message) {
            Ok(receivers) => receivers,
            Err(_) => {
                tracing::debug!(%topic, event, "subscribers gone, event dropped");
                0
            }
        }
    }

    pub async fn subscribe(&self, topic: &Topic) -> broadcast::Receiver<EventMessage> {
        let mut publishers = self.publishers.write().await;

        // Drop channels whose subscribers all disconnected.
        publishers.retain(|_, sender| sender.receiver_count() > 0);

        publishers
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }
}
