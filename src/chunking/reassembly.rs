use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;
use tracing::{debug, trace, warn};

use crate::chunking::chunk_frame::{ChunkFrame, TransferId};

/// Per-transfer reassembly state: the declared total from the first-seen
///  frame, and the chunks received so far, by index.
struct Transfer {
    total: u32,
    chunks: FxHashMap<u32, String>,
    last_update: Instant,
}

/// Accumulates chunk frames per transfer id until a transfer is complete,
///  then yields the reconstructed payload exactly once.
///
/// Frames may arrive in any permutation and duplicated. Completion is tracked
///  by index membership against the total declared by the first-seen frame,
///  never by arrival order or accumulated length - frame validation bounds
///  every index below the total, so `total` distinct stored indices means
///  every index in `[0, total)` is present.
///
/// State for a transfer is reclaimed on completion, or by the age sweep once
///  it has not seen a frame for `max_transfer_age`. The sweep is what bounds
///  memory when frames are lost and a transfer can never complete.
pub struct ReassemblyBuffers {
    transfers: FxHashMap<TransferId, Transfer>,
    max_transfer_age: Duration,
}

impl ReassemblyBuffers {
    pub fn new(max_transfer_age: Duration) -> ReassemblyBuffers {
        ReassemblyBuffers {
            transfers: Default::default(),
            max_transfer_age,
        }
    }

    /// Feeds one (already validated) frame into its transfer's buffer,
    ///  returning the reconstructed payload if this frame completed the
    ///  transfer.
    pub fn on_frame(&mut self, frame: ChunkFrame) -> Option<String> {
        self.on_frame_at(frame, Instant::now())
    }

    fn on_frame_at(&mut self, frame: ChunkFrame, now: Instant) -> Option<String> {
        self.evict_expired(now);

        let transfer = self
            .transfers
            .entry(frame.transfer_id.clone())
            .or_insert_with(|| {
                trace!(
                    "first frame for transfer {} - expecting {} chunks",
                    frame.transfer_id, frame.total
                );
                Transfer {
                    total: frame.total,
                    chunks: Default::default(),
                    last_update: now,
                }
            });

        if frame.total != transfer.total {
            // the first-seen total stays authoritative; a frame disagreeing
            //  with it is treated as corruption and rejected
            warn!(
                "frame {} for transfer {} declares {} total chunks where {} were declared first - dropping the frame",
                frame.index, frame.transfer_id, frame.total, transfer.total
            );
            return None;
        }

        transfer.last_update = now;
        if transfer.chunks.insert(frame.index, frame.data).is_some() {
            debug!(
                "duplicate chunk {} for transfer {} - overwriting",
                frame.index, frame.transfer_id
            );
        }

        if transfer.chunks.len() < transfer.total as usize {
            return None;
        }

        let transfer = self.transfers.remove(&frame.transfer_id)?;
        debug!(
            "all {} chunks received for transfer {} - reassembling",
            transfer.total, frame.transfer_id
        );

        // concatenate by ascending index, not by arrival order
        let mut chunks: Vec<(u32, String)> = transfer.chunks.into_iter().collect();
        chunks.sort_by_key(|&(index, _)| index);
        Some(chunks.into_iter().map(|(_, chunk)| chunk).collect())
    }

    fn evict_expired(&mut self, now: Instant) {
        let max_age = self.max_transfer_age;
        self.transfers.retain(|transfer_id, transfer| {
            let expired = now.duration_since(transfer.last_update) >= max_age;
            if expired {
                warn!(
                    "transfer {} saw no frame for {:?} with {}/{} chunks received - giving up on it",
                    transfer_id,
                    max_age,
                    transfer.chunks.len(),
                    transfer.total
                );
            }
            !expired
        });
    }
}
