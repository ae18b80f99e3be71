use bytes::{Bytes, BytesMut};

/// A write payload in one of the three representations the transport accepts.
///
/// Each variant supplies its own byte extraction, so callers hand over
/// whatever they already hold and the write path dispatches once instead of
/// forcing a conversion up front. Text is written as its UTF-8 bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// An immutable byte sequence.
    Bytes(Bytes),
    /// A growable buffer; its readable length is what goes on the wire.
    Buffer(BytesMut),
    /// Text, encoded as UTF-8.
    Text(String),
}

impl Payload {
    /// The bytes this payload puts on the wire.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Payload::Bytes(bytes) => bytes,
            Payload::Buffer(buffer) => buffer,
            Payload::Text(text) => text.as_bytes(),
        }
    }

    /// Number of bytes this payload puts on the wire.
    pub fn len(&self) -> usize {
        match self {
            Payload::Bytes(bytes) => bytes.len(),
            Payload::Buffer(buffer) => buffer.len(),
            Payload::Text(text) => text.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Bytes> for Payload {
    fn from(bytes: Bytes) -> Self {
        Payload::Bytes(bytes)
    }
}

impl From<BytesMut> for Payload {
    fn from(buffer: BytesMut) -> Self {
        Payload::Buffer(buffer)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::Bytes(Bytes::from(bytes))
    }
}

impl From<&[u8]> for Payload {
    fn from(bytes: &[u8]) -> Self {
        Payload::Bytes(Bytes::copy_from_slice(bytes))
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BufMut;

    #[test]
    fn variants_of_equal_content_expose_identical_bytes() {
        let mut buffer = BytesMut::new();
        buffer.put_slice(b"hello world");

        let bytes = Payload::from(Bytes::from_static(b"hello world"));
        let buffered = Payload::from(buffer);
        let text = Payload::from("hello world");

        assert_eq!(bytes.as_bytes(), buffered.as_bytes());
        assert_eq!(bytes.as_bytes(), text.as_bytes());
        assert_eq!(bytes.len(), 11);
        assert_eq!(buffered.len(), 11);
        assert_eq!(text.len(), 11);
    }

    #[test]
    fn text_is_written_as_utf8() {
        let payload = Payload::from("zażółć");
        assert_eq!(payload.as_bytes(), "zażółć".as_bytes());
        assert_eq!(payload.len(), "zażółć".len());
    }

    #[test]
    fn buffer_length_tracks_readable_bytes() {
        let mut buffer = BytesMut::with_capacity(64);
        buffer.put_slice(b"abc");
        let payload = Payload::from(buffer);
        assert_eq!(payload.len(), 3);
        assert!(!payload.is_empty());
    }

    #[test]
    fn empty_payloads_report_empty() {
        assert!(Payload::from(Bytes::new()).is_empty());
        assert!(Payload::from(BytesMut::new()).is_empty());
        assert!(Payload::from("").is_empty());
    }

    #[test]
    fn slice_and_vec_conversions_copy_content() {
        let from_slice = Payload::from(&b"abc"[..]);
        let from_vec = Payload::from(vec![b'a', b'b', b'c']);
        assert_eq!(from_slice.as_bytes(), b"abc");
        assert_eq!(from_slice, from_vec);
    }
}
