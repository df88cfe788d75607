use std::time::Duration;

use tracing::warn;

use crate::chunking::chunk_frame::FRAME_OVERHEAD;

/// Typical path MTU (1500) minus IP/UDP headers, rounded down to leave room
///  for tunneling overhead. Datagrams bigger than this may be dropped silently
///  somewhere on a non-loopback path.
pub const SAFE_DATAGRAM_PAYLOAD: usize = 1400;

#[derive(Debug)]
pub struct MessagingConfig {
    /// Size of the receive loop's datagram buffer. The OS truncates any
    ///  datagram exceeding it on receive, so it must be sized generously above
    ///  the biggest envelope a peer will send.
    pub receive_buffer_size: usize,

    /// Number of payload bytes per chunk frame.
    ///
    /// NB: values approaching [SAFE_DATAGRAM_PAYLOAD] are a configuration
    ///  hazard, not a safe default - the full frame (topic prefix, transfer
    ///  id, indices, chunk data) must stay below the path MTU or frames get
    ///  dropped silently. The default of 4096 matches what peers on the wire
    ///  expect but is only safe on loopback / jumbo-frame paths.
    pub chunk_size: usize,

    /// A reassembly buffer that has not seen a frame for this long is swept.
    ///  This is what bounds memory under packet loss - a transfer missing even
    ///  one frame can never complete and would otherwise linger forever.
    pub max_transfer_age: Duration,
}

impl MessagingConfig {
    pub fn new() -> MessagingConfig {
        MessagingConfig {
            receive_buffer_size: 64 * 1024,
            chunk_size: 4096,
            max_transfer_age: Duration::from_secs(60),
        }
    }

    /// Logs configurations that are syntactically valid but likely to
    ///  misbehave on real networks. Called once when the messaging layer is
    ///  created.
    pub fn warn_on_hazards(&self) {
        if self.chunk_size + FRAME_OVERHEAD > SAFE_DATAGRAM_PAYLOAD {
            warn!(
                "chunk size {} plus frame overhead exceeds the safe datagram payload of {} bytes - \
                 chunk frames may be dropped silently outside loopback",
                self.chunk_size, SAFE_DATAGRAM_PAYLOAD
            );
        }
        if self.chunk_size + FRAME_OVERHEAD > self.receive_buffer_size {
            warn!(
                "chunk size {} plus frame overhead exceeds the receive buffer of {} bytes - \
                 peers with this configuration cannot exchange chunked payloads",
                self.chunk_size, self.receive_buffer_size
            );
        }
    }
}
