use std::fmt::{Display, Formatter};

use anyhow::anyhow;

/// A [TopicId] is the envelope prefix that routes a datagram to the one
///  subscriber registered for it on the receiving side.
///
/// Topic ids are opaque strings; the only structural requirement comes from
///  the wire format: the envelope is split on the first `:`, so a topic id
///  must be non-empty and must not itself contain `:`. [TopicId::new] is the
///  fail-fast point for that precondition - passing an invalid id is
///  programmer misuse, not a network condition, and everything downstream
///  accepts only validated ids.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct TopicId(String);

impl TopicId {
    pub fn new(id: impl Into<String>) -> anyhow::Result<TopicId> {
        let id = id.into();
        if id.is_empty() {
            return Err(anyhow!("topic id must not be empty"));
        }
        if id.contains(':') {
            return Err(anyhow!("topic id must not contain ':': {:?}", id));
        }
        Ok(TopicId(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for TopicId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
