use anyhow::anyhow;

use crate::messaging::topic::TopicId;

/// The envelope is what lets multiple topics share one socket: every datagram
///  payload is `<topic>:<body>` as UTF-8 text, and the receiving side splits
///  on the *first* `:` so the body is fully opaque and may itself contain `:`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Envelope {
    pub topic: TopicId,
    pub body: String,
}

impl Envelope {
    pub fn new(topic: TopicId, body: impl Into<String>) -> Envelope {
        Envelope {
            topic,
            body: body.into(),
        }
    }

    /// Encodes this envelope into a datagram payload.
    pub fn write(&self) -> Vec<u8> {
        format!("{}:{}", self.topic, self.body).into_bytes()
    }

    /// Parses a received datagram payload. Anything that is not UTF-8 text
    ///  with a valid topic prefix is a protocol error - the caller drops the
    ///  datagram with a diagnostic.
    pub fn try_read(buf: &[u8]) -> anyhow::Result<Envelope> {
        let text = std::str::from_utf8(buf)?;
        let (topic, body) = text
            .split_once(':')
            .ok_or_else(|| anyhow!("envelope without topic separator: {:?}", text))?;

        Ok(Envelope {
            topic: TopicId::new(topic)?,
            body: body.to_string(),
        })
    }
}


#[cfg(test)]
mod test {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::simple(b"chat:hello", Some(("chat", "hello")))]
    #[case::body_with_colons(b"chat:a:b:c", Some(("chat", "a:b:c")))]
    #[case::empty_body(b"chat:", Some(("chat", "")))]
    #[case::body_only_colons(b"chat:::", Some(("chat", "::")))]
    #[case::no_separator(b"just a string", None)]
    #[case::empty_topic(b":hello", None)]
    #[case::empty(b"", None)]
    #[case::not_utf8(b"chat:\xff\xfe", None)]
    fn test_envelope_try_read(#[case] buf: &[u8], #[case] expected: Option<(&str, &str)>) {
        match Envelope::try_read(buf) {
            Ok(actual) => {
                let (topic, body) = expected.unwrap();
                assert_eq!(actual.topic.as_str(), topic);
                assert_eq!(actual.body, body);
            }
            Err(e) => {
                println!("{}", e);
                assert!(expected.is_none());
            }
        }
    }

    #[rstest]
    #[case::simple("chat", "hello", b"chat:hello")]
    #[case::body_with_colons("img", "id:0:3:data", b"img:id:0:3:data")]
    #[case::empty_body("chat", "", b"chat:")]
    fn test_envelope_write(#[case] topic: &str, #[case] body: &str, #[case] expected: &[u8]) {
        let envelope = Envelope::new(TopicId::new(topic).unwrap(), body);
        assert_eq!(envelope.write(), expected);
    }

    #[rstest]
    #[case::simple("chat", "hello")]
    #[case::colons_in_body("chat", "a:b::c")]
    fn test_envelope_round_trip(#[case] topic: &str, #[case] body: &str) {
        let envelope = Envelope::new(TopicId::new(topic).unwrap(), body);
        let parsed = Envelope::try_read(&envelope.write()).unwrap();
        assert_eq!(parsed, envelope);
    }
}
