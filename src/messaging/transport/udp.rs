use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::sync::broadcast;
use tracing::{error, trace, warn};

use crate::config::MessagingConfig;
use crate::messaging::transport::{MessageHandler, Transport};

/// [Transport] implementation owning a single UDP socket: the same socket
///  serves concurrent sends and the receive loop, so replies arrive at the
///  port that [Transport::local_port] advertises.
pub struct UdpTransport {
    config: Arc<MessagingConfig>,
    socket: UdpSocket,
    local_port: u16,
    cancel_sender: broadcast::Sender<()>,
}

impl UdpTransport {
    /// Binds to an OS-assigned ephemeral port.
    pub async fn new(config: Arc<MessagingConfig>) -> anyhow::Result<UdpTransport> {
        let (cancel_sender, _) = broadcast::channel(1);

        let socket = UdpSocket::bind(SocketAddr::from_str("0.0.0.0:0")?).await?;
        let local_port = socket.local_addr()?.port();
        trace!("bound datagram socket on port {}", local_port);

        Ok(UdpTransport {
            config,
            socket,
            local_port,
            cancel_sender,
        })
    }
}

#[async_trait::async_trait]
impl Transport for UdpTransport {
    fn local_port(&self) -> u16 {
        self.local_port
    }

    async fn send(&self, to: SocketAddr, buf: &[u8]) -> anyhow::Result<()> {
        self.socket.send_to(buf, to).await?;
        Ok(())
    }

    async fn recv_loop(&self, handler: Arc<dyn MessageHandler>) -> anyhow::Result<()> {
        // sized to the largest expected single datagram - the OS truncates
        //  anything bigger on receive
        let mut buf = vec![0u8; self.config.receive_buffer_size];

        let mut cancel_receiver = self.cancel_sender.subscribe();

        trace!("starting UDP receive loop on port {}", self.local_port);

        loop {
            tokio::select! {
                r = self.socket.recv_from(&mut buf) => {
                    match r {
                        Ok((len, from)) => {
                            handler.handle_message(&buf[..len], from).await;
                        }
                        Err(e) => {
                            // a failed read must not end the loop
                            error!(error = ?e, "error receiving from datagram socket");
                        }
                    }
                }
                _ = cancel_receiver.recv() => break,
            }
        }

        trace!("UDP receive loop on port {} shut down", self.local_port);
        Ok(())
    }

    fn cancel_recv_loop(&self) {
        if let Err(err) = self.cancel_sender.send(()) {
            warn!(?err, "error canceling receive loop");
        }
    }
}
