//! Two messaging peers on loopback exchanging a chat line and a payload big
//!  enough to need chunking.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::{info, Level};

use topicmux::config::MessagingConfig;
use topicmux::messaging::message_listener::MessageListener;
use topicmux::messaging::messaging::{MessageSender, Messaging, MessagingImpl};
use topicmux::messaging::topic::TopicId;
use topicmux::messengers::chunked::ChunkedMessenger;
use topicmux::messengers::plain::PlainMessenger;

fn init_logging() {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .try_init()
        .ok();
}

struct PrintingListener {
    name: &'static str,
}

#[async_trait]
impl MessageListener for PrintingListener {
    async fn on_message(&self, topic: &TopicId, payload: &str) {
        if payload.len() > 80 {
            info!("[{}] topic {}: received {} bytes", self.name, topic, payload.len());
        } else {
            info!("[{}] topic {}: {}", self.name, topic, payload);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let config = Arc::new(MessagingConfig::new());

    let a = Arc::new(MessagingImpl::new(config.clone()).await?);
    let b = Arc::new(MessagingImpl::new(config.clone()).await?);

    let recv_a = {
        let a = a.clone();
        tokio::spawn(async move { a.recv().await })
    };
    let recv_b = {
        let b = b.clone();
        tokio::spawn(async move { b.recv().await })
    };

    info!("peer a on port {}, peer b on port {}", a.local_port(), b.local_port());

    let a_chat = PlainMessenger::new(
        a.clone(),
        TopicId::new("chat")?,
        Arc::new(PrintingListener { name: "a" }),
    ).await;
    let _b_chat = PlainMessenger::new(
        b.clone(),
        TopicId::new("chat")?,
        Arc::new(PrintingListener { name: "b" }),
    ).await;

    let a_image = ChunkedMessenger::new(
        a.clone(),
        TopicId::new("image")?,
        Arc::new(PrintingListener { name: "a" }),
        &config,
    ).await;
    let _b_image = ChunkedMessenger::new(
        b.clone(),
        TopicId::new("image")?,
        Arc::new(PrintingListener { name: "b" }),
        &config,
    ).await;

    a_chat.send("127.0.0.1", b.local_port(), "Hello, World!").await;
    a_image.send("127.0.0.1", b.local_port(), &"x".repeat(10_000)).await;

    sleep(Duration::from_millis(200)).await;

    a.shut_down();
    b.shut_down();
    recv_a.await??;
    recv_b.await??;

    Ok(())
}
