use std::fmt::{Display, Formatter};

use anyhow::anyhow;
use uuid::Uuid;

/// Estimated per-frame wire overhead: a uuid transfer id, two integer fields
///  and three separators, plus the topic prefix. Used for configuration hazard
///  checks, not for exact accounting.
pub const FRAME_OVERHEAD: usize = 64;

/// Opaque token identifying one chunked transmission. Generated as a uuid on
///  the send side; received ids are accepted as-is since peers may generate
///  theirs differently.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct TransferId(String);

impl TransferId {
    pub fn random() -> TransferId {
        TransferId(Uuid::new_v4().to_string())
    }

    /// Like topic ids, a transfer id must be non-empty and free of `:` so the
    ///  field-limited frame split stays unambiguous.
    pub fn new(id: impl Into<String>) -> anyhow::Result<TransferId> {
        let id = id.into();
        if id.is_empty() {
            return Err(anyhow!("transfer id must not be empty"));
        }
        if id.contains(':') {
            return Err(anyhow!("transfer id must not contain ':': {:?}", id));
        }
        Ok(TransferId(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for TransferId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}


/// One fragment of a chunked transfer, wire-framed as
///  `<transferId>:<index>:<total>:<data>`. The split is limited to four
///  fields, so `data` may itself contain `:`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ChunkFrame {
    pub transfer_id: TransferId,
    pub index: u32,
    pub total: u32,
    pub data: String,
}

impl ChunkFrame {
    pub fn write(&self) -> String {
        format!("{}:{}:{}:{}", self.transfer_id, self.index, self.total, self.data)
    }

    /// Parses and validates a frame body: four fields, base-10 integer index
    ///  and total, `total >= 1` and `index` inside `[0, total)`. Anything else
    ///  is a protocol error and the frame is dropped by the caller.
    pub fn try_read(body: &str) -> anyhow::Result<ChunkFrame> {
        let mut fields = body.splitn(4, ':');
        let (id, index, total, data) =
            match (fields.next(), fields.next(), fields.next(), fields.next()) {
                (Some(id), Some(index), Some(total), Some(data)) => (id, index, total, data),
                _ => return Err(anyhow!("chunk frame with wrong field count: {:?}", body)),
            };

        let transfer_id = TransferId::new(id)?;
        let index: u32 = index
            .parse()
            .map_err(|_| anyhow!("chunk index is not an integer: {:?}", index))?;
        let total: u32 = total
            .parse()
            .map_err(|_| anyhow!("chunk total is not an integer: {:?}", total))?;

        if total == 0 {
            return Err(anyhow!("chunk total must be at least 1"));
        }
        if index >= total {
            return Err(anyhow!("chunk index {} outside of declared total {}", index, total));
        }

        Ok(ChunkFrame {
            transfer_id,
            index,
            total,
            data: data.to_string(),
        })
    }
}
