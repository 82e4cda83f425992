//! Length-delimited framing shared by the built-in codecs.
//!
//! Each message on the wire is two frames: the header, serialized with the codec's
//! [`Format`], then the body exactly as the caller encoded it. Frames are prefixed
//! with a 4-byte big-endian length.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncWriteExt, ReadHalf, WriteHalf};
use tokio_util::codec::{FramedRead, FramedWrite, LengthDelimitedCodec};

use crate::codec::{Codec, CodecRead, CodecWrite, Connection};
use crate::error::CodecError;
use crate::format::Format;
use crate::header::Header;

/// Maximum size of a single header or body frame (16MB).
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

fn length_delimited() -> LengthDelimitedCodec {
    LengthDelimitedCodec::builder()
        .max_frame_length(MAX_FRAME_SIZE)
        .new_codec()
}

/// Build a framed codec over `conn` using `format` for headers.
pub fn framed<C: Connection>(conn: C, format: Format) -> Codec {
    let (read, write) = tokio::io::split(conn);
    Codec::new(
        FramedReader {
            frames: FramedRead::new(read, length_delimited()),
            format,
        },
        FramedWriter {
            frames: FramedWrite::new(write, length_delimited()),
            format,
        },
        format,
    )
}

pub struct FramedReader<C> {
    frames: FramedRead<ReadHalf<C>, LengthDelimitedCodec>,
    format: Format,
}

impl<C: Connection> FramedReader<C> {
    async fn next_frame(&mut self) -> Result<BytesMut, CodecError> {
        match self.frames.next().await {
            Some(Ok(frame)) => Ok(frame),
            Some(Err(e)) => Err(CodecError::Io(e)),
            None => Err(CodecError::Closed),
        }
    }
}

#[async_trait]
impl<C: Connection> CodecRead for FramedReader<C> {
    async fn read_header(&mut self) -> Result<Header, CodecError> {
        let frame = self.next_frame().await?;
        self.format.decode(&frame)
    }

    async fn read_body(&mut self) -> Result<Bytes, CodecError> {
        Ok(self.next_frame().await?.freeze())
    }
}

pub struct FramedWriter<C> {
    frames: FramedWrite<WriteHalf<C>, LengthDelimitedCodec>,
    format: Format,
}

#[async_trait]
impl<C: Connection> CodecWrite for FramedWriter<C> {
    async fn write(&mut self, header: &Header, body: Bytes) -> Result<(), CodecError> {
        let header = self.format.encode(header)?;
        // Both frames are buffered before a single flush so a header never
        // reaches the wire without its body.
        self.frames.feed(header).await?;
        self.frames.feed(body).await?;
        SinkExt::<Bytes>::flush(&mut self.frames).await?;
        Ok(())
    }

    /// Shut down the outbound half without flushing. Bytes still buffered from a write
    /// that never completed are dropped, so closing cannot stall on a peer that has
    /// stopped reading.
    async fn close(&mut self) -> Result<(), CodecError> {
        self.frames.get_mut().shutdown().await?;
        Ok(())
    }
}
