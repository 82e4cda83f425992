use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::CodecError;
use crate::format::Format;
use crate::header::Header;

/// A bidirectional byte stream a codec can be layered on.
pub trait Connection: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

impl<T> Connection for T where T: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

/// The inbound half of a codec.
///
/// Every header is followed by exactly one body frame; callers that do not want the
/// body must still consume it with [`CodecRead::discard_body`] to stay frame-aligned.
#[async_trait]
pub trait CodecRead: Send {
    async fn read_header(&mut self) -> Result<Header, CodecError>;

    async fn read_body(&mut self) -> Result<Bytes, CodecError>;

    async fn discard_body(&mut self) -> Result<(), CodecError> {
        self.read_body().await.map(drop)
    }
}

/// The outbound half of a codec.
#[async_trait]
pub trait CodecWrite: Send {
    /// Write one complete frame (header followed by body) and flush it.
    async fn write(&mut self, header: &Header, body: Bytes) -> Result<(), CodecError>;

    /// Shut down the outbound direction of the connection.
    async fn close(&mut self) -> Result<(), CodecError>;
}

/// A codec instance bound to one connection, split into its two halves.
pub struct Codec {
    pub reader: Box<dyn CodecRead>,
    pub writer: Box<dyn CodecWrite>,
    pub format: Format,
}

impl Codec {
    pub fn new(
        reader: impl CodecRead + 'static,
        writer: impl CodecWrite + 'static,
        format: Format,
    ) -> Self {
        Self {
            reader: Box::new(reader),
            writer: Box::new(writer),
            format,
        }
    }

    pub fn split(self) -> (Box<dyn CodecRead>, Box<dyn CodecWrite>, Format) {
        (self.reader, self.writer, self.format)
    }
}

impl std::fmt::Debug for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Codec")
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}
