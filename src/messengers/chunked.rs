use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{trace, warn};

use crate::chunking::chunk_frame::ChunkFrame;
use crate::chunking::fragmenter::fragment;
use crate::chunking::reassembly::ReassemblyBuffers;
use crate::config::MessagingConfig;
use crate::messaging::message_listener::MessageListener;
use crate::messaging::messaging::{MessageSender, Messaging};
use crate::messaging::topic::TopicId;

/// The chunked topic messenger: payloads too big for one datagram are
///  fragmented into chunk frames on send and reassembled on receive; the
///  registered listener sees each payload whole, exactly once per transfer.
pub struct ChunkedMessenger {
    messaging: Arc<dyn Messaging>,
    topic: TopicId,
    chunk_size: usize,
}

impl ChunkedMessenger {
    /// Registers the reassembling receive side for `topic`, forwarding each
    ///  completed payload to `listener`, and returns the messenger for the
    ///  send direction.
    pub async fn new(
        messaging: Arc<dyn Messaging>,
        topic: TopicId,
        listener: Arc<dyn MessageListener>,
        config: &MessagingConfig,
    ) -> ChunkedMessenger {
        let reassembling = Arc::new(ReassemblingListener {
            buffers: Mutex::new(ReassemblyBuffers::new(config.max_transfer_age)),
            delegate: listener,
        });
        messaging.subscribe(topic.clone(), reassembling).await;

        ChunkedMessenger {
            messaging,
            topic,
            chunk_size: config.chunk_size,
        }
    }

    pub fn topic(&self) -> &TopicId {
        &self.topic
    }

    /// Fragments `payload` and sends every frame as its own datagram, in
    ///  index order. Fire-and-forget per frame: no batching, no backpressure,
    ///  and no guarantee of in-order arrival on the receiving side.
    pub async fn send(&self, host: &str, port: u16, payload: &str) {
        let (transfer_id, frames) = fragment(payload, self.chunk_size);
        let total = frames.len();

        for frame in frames {
            self.messaging.send(host, port, &self.topic, &frame.write()).await;
        }

        trace!("sent transfer {} to {}:{} in {} chunks", transfer_id, host, port, total);
    }
}


/// Receive side: parses chunk frames, feeds the reassembly buffers, and
///  forwards each completed payload to the application listener.
struct ReassemblingListener {
    buffers: Mutex<ReassemblyBuffers>,
    delegate: Arc<dyn MessageListener>,
}

#[async_trait]
impl MessageListener for ReassemblingListener {
    async fn on_message(&self, topic: &TopicId, payload: &str) {
        let frame = match ChunkFrame::try_read(payload) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("received a malformed chunk frame on topic {} - discarding: {}", topic, e);
                return;
            }
        };

        // the lock is held for the buffer update only, never across the delegate
        let completed = self.buffers.lock().await.on_frame(frame);

        if let Some(payload) = completed {
            self.delegate.on_message(topic, &payload).await;
        }
    }
}
