//! The in-process fan-out bus itself: a guarded map of topic name to
//! broadcast channel plus a retained last-terminal frame for late
//! subscribers.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast};
use tracing::trace;

const TOPIC_CHANNEL_CAPACITY: usize = 256;

struct Topic {
    sender: broadcast::Sender<Arc<Value>>,
    last_terminal: Option<Arc<Value>>,
}

impl Topic {
    fn new() -> Self {
        let (sender, _) = broadcast::channel(TOPIC_CHANNEL_CAPACITY);
        Self {
            sender,
            last_terminal: None,
        }
    }
}

/// Shared handle to the progress bus. Cheap to clone; every clone sees the
/// same topic map.
#[derive(Clone, Default)]
pub struct Bus {
    topics: Arc<Mutex<HashMap<String, Topic>>>,
}

impl Bus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish `frame` to `topic`. Never blocks and never errors: a topic
    /// with no live subscribers simply drops the frame. Set `is_terminal`
    /// for the one frame per run that should be replayed to subscribers
    /// that connect afterward.
    pub async fn publish(&self, topic: &str, frame: Value, is_terminal: bool) {
        let frame = Arc::new(frame);
        let mut topics = self.topics.lock().await;
        let entry = topics.entry(topic.to_string()).or_insert_with(Topic::new);
        let _ = entry.sender.send(frame.clone());
        if is_terminal {
            entry.last_terminal = Some(frame);
        }
        trace!(topic, is_terminal, "published progress frame");
    }

    /// Subscribe to `topic`. Returns a [`Subscription`] that replays the
    /// topic's retained terminal frame (if any) before live frames.
    pub async fn subscribe(&self, topic: &str) -> Subscription {
        let mut topics = self.topics.lock().await;
        let entry = topics.entry(topic.to_string()).or_insert_with(Topic::new);
        Subscription {
            receiver: entry.sender.subscribe(),
            replay: entry.last_terminal.clone(),
        }
    }
}

pub struct Subscription {
    receiver: broadcast::Receiver<Arc<Value>>,
    replay: Option<Arc<Value>>,
}

impl Subscription {
    /// Next frame for this subscriber: the retained terminal replay first
    /// (once), then live broadcasts, skipping over lag gaps. `None` means
    /// the topic's sender has been dropped, which does not happen while
    /// the owning [`Bus`] is alive.
    pub async fn next(&mut self) -> Option<Arc<Value>> {
        if let Some(replay) = self.replay.take() {
            return Some(replay);
        }
        loop {
            match self.receiver.recv().await {
                Ok(frame) => return Some(frame),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn late_subscriber_does_not_replay_non_terminal_frames() {
        let bus = Bus::new();
        bus.publish("run-1", json!({"stage": "file_start"}), false).await;
        let mut sub = bus.subscribe("run-1").await;
        bus.publish("run-1", json!({"stage": "file_done"}), false).await;
        let frame = sub.next().await.unwrap();
        assert_eq!(frame["stage"], "file_done");
    }

    #[tokio::test]
    async fn late_subscriber_replays_retained_terminal_frame() {
        let bus = Bus::new();
        bus.publish("run-1", json!({"status": "completed"}), true).await;
        let mut sub = bus.subscribe("run-1").await;
        let frame = sub.next().await.unwrap();
        assert_eq!(frame["status"], "completed");
    }

    #[tokio::test]
    async fn publish_with_no_subscribers_does_not_block_or_panic() {
        let bus = Bus::new();
        bus.publish("run-1", json!({"stage": "file_start"}), false).await;
    }

    #[tokio::test]
    async fn dropped_subscriber_is_silently_ignored_by_publisher() {
        let bus = Bus::new();
        let sub = bus.subscribe("run-1").await;
        drop(sub);
        bus.publish("run-1", json!({"stage": "file_start"}), false).await;
    }

    #[tokio::test]
    async fn each_topic_is_independent() {
        let bus = Bus::new();
        let mut run_sub = bus.subscribe("run-1").await;
        let mut review_sub = bus.subscribe("review-1").await;
        bus.publish("run-1", json!({"scope": "run"}), false).await;
        let frame = run_sub.next().await.unwrap();
        assert_eq!(frame["scope"], "run");
        bus.publish("review-1", json!({"scope": "review"}), false).await;
        let frame = review_sub.next().await.unwrap();
        assert_eq!(frame["scope"], "review");
    }
}
