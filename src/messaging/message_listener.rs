use async_trait::async_trait;
#[cfg(test)] use mockall::automock;

use crate::messaging::topic::TopicId;

/// Subscriber callback seam. Implementations are registered per topic with
///  [crate::messaging::messaging::Messaging::subscribe] and called once per
///  logical message - once per received datagram for plain topics, once per
///  fully reassembled transfer for chunked topics.
///
/// This is a blocking call, holding up the central receive loop for *all*
///  topics sharing the transport. Non-trivial work should probably be
///  offloaded to some asynchronous processing, but it is up to the listener
///  implementation to decide and do this.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MessageListener: 'static + Sync + Send {
    async fn on_message(&self, topic: &TopicId, payload: &str);
}
