//! In-process event fan-out over a tokio broadcast channel
//!
//! Each event is serialized to one JSON object tagged with its topic and
//! a timestamp, then offered to every live subscriber. Publishing with no
//! subscribers, or with a lagging subscriber, is not an error; the core
//! never waits on observers.

use foreman_application::ports::event_publisher::{CoordinatorEvent, EventPublisher};
use tokio::sync::broadcast;
use tracing::debug;

/// Fan-out publisher for coordinator events
pub struct BroadcastEventPublisher {
    tx: broadcast::Sender<serde_json::Value>,
}

impl BroadcastEventPublisher {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to the event stream. Slow readers miss events rather
    /// than slowing the publisher.
    pub fn subscribe(&self) -> broadcast::Receiver<serde_json::Value> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl EventPublisher for BroadcastEventPublisher {
    fn publish(&self, event: CoordinatorEvent) {
        let topic = event.topic();
        let Ok(serde_json::Value::Object(mut record)) = serde_json::to_value(&event) else {
            return;
        };
        record.insert(
            "topic".to_string(),
            serde_json::Value::String(topic.to_string()),
        );
        record.insert(
            "at".to_string(),
            serde_json::Value::String(
                chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            ),
        );

        debug!(topic, "publishing event");
        // Send fails only when nobody is listening.
        let _ = self.tx.send(serde_json::Value::Object(record));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use foreman_domain::DecisionTier;

    fn sample_event() -> CoordinatorEvent {
        CoordinatorEvent::DecisionMade {
            session_id: "s-1".to_string(),
            kind: "propose_plan".to_string(),
            tier: DecisionTier::Rules,
            confidence: 0.9,
        }
    }

    #[tokio::test]
    async fn test_subscriber_receives_tagged_event() {
        let publisher = BroadcastEventPublisher::new(8);
        let mut rx = publisher.subscribe();

        publisher.publish(sample_event());

        let value = rx.recv().await.unwrap();
        assert_eq!(value["topic"], "decisions");
        assert_eq!(value["event"], "decision_made");
        assert_eq!(value["session_id"], "s-1");
        assert!(value["at"].is_string());
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_silent() {
        let publisher = BroadcastEventPublisher::new(8);
        publisher.publish(sample_event());
        assert_eq!(publisher.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_each_subscriber_sees_every_event() {
        let publisher = BroadcastEventPublisher::new(8);
        let mut rx1 = publisher.subscribe();
        let mut rx2 = publisher.subscribe();

        publisher.publish(sample_event());

        assert_eq!(rx1.recv().await.unwrap()["topic"], "decisions");
        assert_eq!(rx2.recv().await.unwrap()["topic"], "decisions");
    }
}
