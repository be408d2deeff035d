//! Immutable upload payloads.

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::{Checksum, Hasher};

/// The exact bytes of an upload, captured once.
///
/// The same `Payload` is digested for the authorization and attached as the
/// request body, so the signed checksum always describes the transmitted
/// bytes. Cloning is cheap and shares the underlying buffer.
///
/// Streams are drained completely before a `Payload` exists; a checksum is
/// never taken over a prefix.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Payload(Bytes);

impl Payload {
    /// Capture the given bytes.
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    /// Buffer a blocking reader to the end.
    pub fn read(mut reader: impl std::io::Read) -> std::io::Result<Self> {
        let mut buffer = Vec::new();
        reader.read_to_end(&mut buffer)?;
        Ok(Self::new(buffer))
    }

    /// Buffer an async reader to the end.
    pub async fn read_async<R>(mut reader: R) -> std::io::Result<Self>
    where
        R: AsyncRead + Unpin,
    {
        let mut buffer = Vec::new();
        reader.read_to_end(&mut buffer).await?;
        Ok(Self::new(buffer))
    }

    /// Compute the SHA-256 checksum of the payload.
    pub fn checksum(&self) -> Checksum {
        self.checksum_with(Hasher::Sha256)
    }

    /// Compute the checksum of the payload with the given algorithm.
    pub fn checksum_with(&self, hasher: Hasher) -> Checksum {
        hasher.checksum(&self.0)
    }

    /// Length in bytes, as declared in `content-length`.
    pub fn len(&self) -> u64 {
        self.0.len() as u64
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The payload bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// A shared handle to the payload buffer.
    pub fn bytes(&self) -> Bytes {
        self.0.clone()
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl From<&'static [u8]> for Payload {
    fn from(bytes: &'static [u8]) -> Self {
        Self::new(Bytes::from_static(bytes))
    }
}

impl From<&'static str> for Payload {
    fn from(text: &'static str) -> Self {
        Self::new(Bytes::from_static(text.as_bytes()))
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

impl AsRef<[u8]> for Payload {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_checksums_the_captured_bytes() {
        let payload = Payload::from("hello");
        assert_eq!(payload.len(), 5);
        assert_eq!(payload.checksum(), Hasher::Sha256.checksum(b"hello"));
    }

    #[test]
    fn it_buffers_a_reader_completely() -> std::io::Result<()> {
        let source = vec![7u8; 64 * 1024 + 3];
        let payload = Payload::read(std::io::Cursor::new(source.clone()))?;

        assert_eq!(payload.len(), source.len() as u64);
        assert_eq!(payload.checksum(), Hasher::Sha256.checksum(&source));
        Ok(())
    }

    #[tokio::test]
    async fn it_buffers_an_async_reader_completely() -> std::io::Result<()> {
        let source: &[u8] = b"streamed in several pieces";
        let payload = Payload::read_async(source).await?;

        assert_eq!(payload.as_bytes(), source);
        Ok(())
    }

    #[test]
    fn it_shares_the_buffer_between_clones() {
        let payload = Payload::from(vec![1, 2, 3]);
        let clone = payload.clone();
        assert_eq!(payload.bytes().as_ptr(), clone.bytes().as_ptr());
    }

    #[test]
    fn it_allows_empty_payloads() {
        let payload = Payload::default();
        assert!(payload.is_empty());
        assert_eq!(
            payload.checksum().to_string(),
            "47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU="
        );
    }
}
