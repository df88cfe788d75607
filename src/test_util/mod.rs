//! This module contains utilities that are useful for testing code based on
//!  the messaging functionality. They are used for testing the crate itself,
//!  and they are exported for application testing.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::messaging::message_listener::MessageListener;
use crate::messaging::topic::TopicId;

/// A [MessageListener] that forwards every delivery into an unbounded channel
///  so tests can await deliveries and assert on them.
pub struct RecordingListener {
    sender: mpsc::UnboundedSender<(TopicId, String)>,
}

impl RecordingListener {
    pub fn new() -> (Arc<RecordingListener>, mpsc::UnboundedReceiver<(TopicId, String)>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Arc::new(RecordingListener { sender }), receiver)
    }
}

#[async_trait]
impl MessageListener for RecordingListener {
    async fn on_message(&self, topic: &TopicId, payload: &str) {
        // a dropped receiver just means the test is no longer interested
        let _ = self.sender.send((topic.clone(), payload.to_string()));
    }
}
