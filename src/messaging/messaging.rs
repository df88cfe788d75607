use std::fmt::{Debug, Formatter};
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
#[cfg(test)] use mockall::automock;
use rustc_hash::FxHashMap;
use tokio::net::lookup_host;
use tokio::sync::RwLock;
use tracing::{debug, error, trace, warn};

use crate::config::MessagingConfig;
use crate::messaging::envelope::Envelope;
use crate::messaging::message_listener::MessageListener;
use crate::messaging::topic::TopicId;
use crate::messaging::transport::udp::UdpTransport;
use crate::messaging::transport::{MessageHandler, Transport};

#[cfg_attr(test, automock)]
#[async_trait]
pub trait MessageSender: Send + Sync + 'static {
    /// The locally bound port, for peers to discover.
    fn local_port(&self) -> u16;

    /// Fire-and-forget send: an unresolvable host or I/O failure is logged
    ///  and swallowed.
    async fn send(&self, host: &str, port: u16, topic: &TopicId, payload: &str) {
        if let Err(e) = self.try_send(host, port, topic, payload).await {
            error!("error sending message: {}", e);
        }
    }

    async fn try_send(&self, host: &str, port: u16, topic: &TopicId, payload: &str) -> anyhow::Result<()>;
}

#[async_trait]
pub trait Messaging: MessageSender {
    /// Installs the listener for a topic, replacing any previous registration -
    ///  the latest registration receives all subsequent traffic. Safe to call
    ///  from any task while the receive loop is dispatching.
    ///
    /// Topic preconditions (non-empty, no `:`) are enforced by [TopicId::new]
    ///  at the call site; there is no way to register an invalid topic.
    async fn subscribe(&self, topic: TopicId, listener: Arc<dyn MessageListener>);

    /// Removes the registration for a topic; no-op if there is none.
    async fn unsubscribe(&self, topic: &TopicId);

    /// Runs the receive loop until [Messaging::shut_down] is called. This is
    ///  meant to be spawned as the one background task of this instance.
    async fn recv(&self) -> anyhow::Result<()>;

    /// Signals the receive loop to stop, making [Messaging::recv] return so
    ///  the task can be joined during shutdown.
    fn shut_down(&self);
}

pub struct MessagingImpl {
    listeners: Arc<RwLock<FxHashMap<TopicId, Arc<dyn MessageListener>>>>,
    transport: Arc<dyn Transport>,
}

impl Debug for MessagingImpl {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "MessagingImpl{{port:{}}}", self.transport.local_port())
    }
}

impl MessagingImpl {
    pub async fn new(config: Arc<MessagingConfig>) -> anyhow::Result<MessagingImpl> {
        config.warn_on_hazards();
        let transport = Arc::new(UdpTransport::new(config).await?);
        Ok(Self::with_transport(transport))
    }

    pub fn with_transport(transport: Arc<dyn Transport>) -> MessagingImpl {
        MessagingImpl {
            listeners: Default::default(),
            transport,
        }
    }
}

#[async_trait]
impl MessageSender for MessagingImpl {
    fn local_port(&self) -> u16 {
        self.transport.local_port()
    }

    async fn try_send(&self, host: &str, port: u16, topic: &TopicId, payload: &str) -> anyhow::Result<()> {
        trace!(host, port, %topic, "sending message");

        // endpoints are resolved per send and never stored
        let to = lookup_host((host, port))
            .await?
            .next()
            .ok_or_else(|| anyhow!("host resolved to no addresses: {:?}", host))?;

        let buf = Envelope::new(topic.clone(), payload).write();
        self.transport.send(to, &buf).await
    }
}

#[async_trait]
impl Messaging for MessagingImpl {
    async fn subscribe(&self, topic: TopicId, listener: Arc<dyn MessageListener>) {
        let prev = self.listeners.write().await
            .insert(topic.clone(), listener);
        if prev.is_some() {
            debug!(%topic, "replacing previously registered listener");
        }
    }

    async fn unsubscribe(&self, topic: &TopicId) {
        let prev = self.listeners.write().await
            .remove(topic);
        if prev.is_none() {
            debug!(%topic, "unsubscribing a topic that was not registered - ignoring");
        }
    }

    async fn recv(&self) -> anyhow::Result<()> {
        let handler = ReceivedMessageHandler {
            listeners: self.listeners.clone(),
        };
        self.transport.recv_loop(Arc::new(handler)).await
    }

    fn shut_down(&self) {
        self.transport.cancel_recv_loop();
    }
}


struct ReceivedMessageHandler {
    listeners: Arc<RwLock<FxHashMap<TopicId, Arc<dyn MessageListener>>>>,
}

#[async_trait]
impl MessageHandler for ReceivedMessageHandler {
    async fn handle_message(&self, buf: &[u8], sender: SocketAddr) {
        trace!("received {} bytes from {}", buf.len(), sender);

        let Envelope { topic, body } = match Envelope::try_read(buf) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!("received a datagram without a valid envelope - discarding: {}", e);
                return;
            }
        };

        // short-held read lock: look up and clone, dispatch without the lock
        let listener = self.listeners.read().await.get(&topic).cloned();

        match listener {
            Some(listener) => {
                let dispatch_topic = topic.clone();
                let dispatch = tokio::spawn(async move {
                    listener.on_message(&dispatch_topic, &body).await;
                });
                // awaiting the handle keeps dispatch synchronous on the receive
                //  task while isolating a panicking listener from the loop
                if dispatch.await.is_err() {
                    error!("listener for topic {} panicked while handling a message - continuing", topic);
                }
            }
            None => {
                debug!("received message for topic {} for which there is no listener (yet?) - ignoring", topic);
            }
        }
    }
}


#[cfg(test)]
mod test {
    use std::str::FromStr;
    use std::time::Duration;

    use tokio::time::{sleep, timeout};

    use crate::messaging::message_listener::MockMessageListener;
    use crate::test_util::RecordingListener;

    use super::*;

    fn sender_addr() -> SocketAddr {
        SocketAddr::from_str("127.0.0.1:7777").unwrap()
    }

    fn handler_with(topic: &TopicId, listener: Arc<dyn MessageListener>) -> ReceivedMessageHandler {
        let mut listeners: FxHashMap<TopicId, Arc<dyn MessageListener>> = FxHashMap::default();
        listeners.insert(topic.clone(), listener);
        ReceivedMessageHandler {
            listeners: Arc::new(RwLock::new(listeners)),
        }
    }

    #[tokio::test]
    async fn test_dispatch_to_registered_listener() {
        let topic = TopicId::new("chat").unwrap();

        let mut listener = MockMessageListener::new();
        listener
            .expect_on_message()
            .withf(|topic, payload| topic.as_str() == "chat" && payload == "hello world")
            .times(1)
            .returning(|_, _| ());

        let handler = handler_with(&topic, Arc::new(listener));
        handler.handle_message(b"chat:hello world", sender_addr()).await;
    }

    #[tokio::test]
    async fn test_unknown_topic_is_dropped_silently() {
        let topic = TopicId::new("chat").unwrap();
        let (listener, mut received) = RecordingListener::new();

        let handler = handler_with(&topic, listener);
        handler.handle_message(b"other:hello", sender_addr()).await;

        assert!(received.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_invalid_envelope_is_dropped_silently() {
        let topic = TopicId::new("chat").unwrap();
        let (listener, mut received) = RecordingListener::new();
        let handler = handler_with(&topic, listener);

        handler.handle_message(b"no separator at all", sender_addr()).await;
        handler.handle_message(b":empty topic", sender_addr()).await;
        handler.handle_message(b"", sender_addr()).await;
        handler.handle_message(b"chat\xff\xfe:not utf8", sender_addr()).await;

        assert!(received.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_body_keeps_embedded_separators() {
        let topic = TopicId::new("chat").unwrap();
        let (listener, mut received) = RecordingListener::new();
        let handler = handler_with(&topic, listener);

        handler.handle_message(b"chat:a:b::c", sender_addr()).await;

        let (_, payload) = received.recv().await.unwrap();
        assert_eq!(payload, "a:b::c");
    }

    #[tokio::test]
    async fn test_panicking_listener_does_not_poison_dispatch() {
        struct PanickingListener {}
        #[async_trait]
        impl MessageListener for PanickingListener {
            async fn on_message(&self, _topic: &TopicId, _payload: &str) {
                panic!("listener blew up");
            }
        }

        let topic = TopicId::new("chat").unwrap();
        let handler = handler_with(&topic, Arc::new(PanickingListener {}));

        // must not propagate the panic
        handler.handle_message(b"chat:boom", sender_addr()).await;

        // and dispatch keeps working afterwards
        let (listener, mut received) = RecordingListener::new();
        handler.listeners.write().await.insert(topic, listener);
        handler.handle_message(b"chat:still alive", sender_addr()).await;
        let (_, payload) = received.recv().await.unwrap();
        assert_eq!(payload, "still alive");
    }

    #[tokio::test]
    async fn test_subscribe_replaces_and_unsubscribe_removes() {
        let config = Arc::new(MessagingConfig::new());
        let messaging = MessagingImpl::new(config).await.unwrap();
        let topic = TopicId::new("chat").unwrap();

        let handler = ReceivedMessageHandler {
            listeners: messaging.listeners.clone(),
        };

        let (first, mut first_received) = RecordingListener::new();
        let (second, mut second_received) = RecordingListener::new();

        messaging.subscribe(topic.clone(), first).await;
        messaging.subscribe(topic.clone(), second).await;
        handler.handle_message(b"chat:to the replacement", sender_addr()).await;

        assert!(first_received.try_recv().is_err());
        let (_, payload) = second_received.recv().await.unwrap();
        assert_eq!(payload, "to the replacement");

        messaging.unsubscribe(&topic).await;
        // unsubscribing again is a no-op
        messaging.unsubscribe(&topic).await;
        handler.handle_message(b"chat:into the void", sender_addr()).await;
        assert!(second_received.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_round_trip_over_real_sockets() {
        let config = Arc::new(MessagingConfig::new());
        let a = Arc::new(MessagingImpl::new(config.clone()).await.unwrap());
        let b = Arc::new(MessagingImpl::new(config).await.unwrap());

        let topic = TopicId::new("chat").unwrap();
        let (listener, mut received) = RecordingListener::new();
        b.subscribe(topic.clone(), listener).await;

        let recv_task = {
            let b = b.clone();
            tokio::spawn(async move { b.recv().await })
        };

        a.send("127.0.0.1", b.local_port(), &topic, "Hello, World!").await;

        let (recv_topic, payload) = timeout(Duration::from_secs(5), received.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(recv_topic, topic);
        assert_eq!(payload, "Hello, World!");

        // exactly once
        sleep(Duration::from_millis(100)).await;
        assert!(received.try_recv().is_err());

        b.shut_down();
        timeout(Duration::from_secs(5), recv_task)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_send_to_unresolvable_host_is_swallowed() {
        let config = Arc::new(MessagingConfig::new());
        let a = MessagingImpl::new(config).await.unwrap();
        let topic = TopicId::new("chat").unwrap();

        assert!(a.try_send("", 0, &topic, "into nowhere").await.is_err());

        // the fire-and-forget path logs and swallows the same failure
        a.send("", 0, &topic, "into nowhere").await;
    }

    /// The receive buffer bounds the biggest deliverable envelope: the OS
    ///  truncates longer datagrams, and what arrives is the truncated prefix.
    #[tokio::test]
    async fn test_oversized_datagram_is_truncated_at_the_receive_buffer() {
        let sender_config = Arc::new(MessagingConfig::new());
        let receiver_config = Arc::new(MessagingConfig {
            receive_buffer_size: 32,
            ..MessagingConfig::new()
        });

        let a = Arc::new(MessagingImpl::new(sender_config).await.unwrap());
        let b = Arc::new(MessagingImpl::new(receiver_config).await.unwrap());

        let topic = TopicId::new("chat").unwrap();
        let (listener, mut received) = RecordingListener::new();
        b.subscribe(topic.clone(), listener).await;

        let recv_task = {
            let b = b.clone();
            tokio::spawn(async move { b.recv().await })
        };

        let payload = "a".repeat(100);
        a.send("127.0.0.1", b.local_port(), &topic, &payload).await;

        let (_, delivered) = timeout(Duration::from_secs(5), received.recv())
            .await
            .unwrap()
            .unwrap();
        // 32 buffered bytes minus the 5-byte "chat:" prefix
        assert_eq!(delivered, "a".repeat(27));

        b.shut_down();
        timeout(Duration::from_secs(5), recv_task)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }
}
