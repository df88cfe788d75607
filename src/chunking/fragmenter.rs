use tracing::trace;

use crate::chunking::chunk_frame::{ChunkFrame, TransferId};

/// Splits a payload into chunk frames under a fresh random transfer id,
///  returned in index order with `total = ceil(len / chunk_size)`.
///
/// Chunks never split a multi-byte character, so a chunk can fall short of
///  `chunk_size` by up to three bytes to end on a character boundary. Callers
///  feed 7-bit-safe text (the presentation layer encodes binary content
///  upstream), where chunk sizes are exact.
///
/// An empty payload yields no frames.
pub fn fragment(payload: &str, chunk_size: usize) -> (TransferId, Vec<ChunkFrame>) {
    assert!(chunk_size > 0, "chunk size must be positive");

    let transfer_id = TransferId::random();
    let chunks = split_at_char_boundaries(payload, chunk_size);
    let total = chunks.len() as u32;

    trace!(
        "fragmenting {} bytes into {} chunks as transfer {}",
        payload.len(),
        total,
        transfer_id
    );

    let frames = chunks
        .into_iter()
        .enumerate()
        .map(|(index, data)| ChunkFrame {
            transfer_id: transfer_id.clone(),
            index: index as u32,
            total,
            data: data.to_string(),
        })
        .collect();

    (transfer_id, frames)
}

fn split_at_char_boundaries(payload: &str, chunk_size: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut rest = payload;

    while !rest.is_empty() {
        let mut end = chunk_size.min(rest.len());
        while end > 0 && !rest.is_char_boundary(end) {
            end -= 1;
        }
        if end == 0 {
            // chunk_size is smaller than the first character: emit the whole
            //  character rather than looping forever
            end = rest.chars().next().map(char::len_utf8).unwrap_or(rest.len());
        }

        let (chunk, tail) = rest.split_at(end);
        chunks.push(chunk);
        rest = tail;
    }

    chunks
}
