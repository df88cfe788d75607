use std::sync::Arc;

use crate::messaging::message_listener::MessageListener;
use crate::messaging::messaging::{MessageSender, Messaging};
use crate::messaging::topic::TopicId;

/// The pass-through topic messenger: sends strings unchanged under its fixed
///  topic, and received strings reach the listener unchanged, once per
///  received datagram.
pub struct PlainMessenger {
    messaging: Arc<dyn Messaging>,
    topic: TopicId,
}

impl PlainMessenger {
    /// Registers `listener` for `topic` and returns the messenger for the
    ///  send direction.
    pub async fn new(
        messaging: Arc<dyn Messaging>,
        topic: TopicId,
        listener: Arc<dyn MessageListener>,
    ) -> PlainMessenger {
        messaging.subscribe(topic.clone(), listener).await;
        PlainMessenger { messaging, topic }
    }

    pub fn topic(&self) -> &TopicId {
        &self.topic
    }

    /// Fire-and-forget, like the underlying
    ///  [crate::messaging::messaging::MessageSender::send].
    pub async fn send(&self, host: &str, port: u16, message: &str) {
        self.messaging.send(host, port, &self.topic, message).await;
    }
}
